//! Training directory scanning

use std::cmp::Ordering;
use std::path::Path;

use tracing::{debug, info, warn};
use yass3d_core::{Result, SemanticCloud};

use crate::load_cloud;

/// Names of the regular files in `directory`, in natural order.
///
/// Runs of digits compare by numeric value, so `cloud2.pcd` sorts before
/// `cloud10.pcd`. Non-UTF-8 names are skipped.
pub fn list_files<P: AsRef<Path>>(directory: P) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(directory.as_ref())? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!(name = ?name, "skipping file with non UTF-8 name"),
        }
    }
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names)
}

/// A cloud together with the file it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCloud {
    pub name: String,
    pub cloud: SemanticCloud,
}

/// Load every cloud in `directory` in natural file order.
///
/// Files that fail to load are logged and skipped, so the position of a
/// cloud in the result can differ from the position of its file in
/// [`list_files`]; each entry keeps its file name.
pub fn load_clouds<P: AsRef<Path>>(directory: P) -> Result<Vec<NamedCloud>> {
    let directory = directory.as_ref();
    let mut clouds = Vec::new();
    for name in list_files(directory)? {
        match load_cloud(directory.join(&name)) {
            Ok(cloud) => {
                debug!(index = clouds.len(), file = %name, points = cloud.len(), "loaded cloud");
                clouds.push(NamedCloud { name, cloud });
            }
            Err(e) => warn!(file = %name, error = %e, "skipping cloud"),
        }
    }
    info!("Loaded {} training clouds", clouds.len());
    Ok(clouds)
}

/// Compare strings treating digit runs as numbers
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l_run = take_digits(&mut left);
                let r_run = take_digits(&mut right);
                let l_trim = l_run.trim_start_matches('0');
                let r_trim = r_run.trim_start_matches('0');
                let ordering = l_trim
                    .len()
                    .cmp(&r_trim.len())
                    .then_with(|| l_trim.cmp(r_trim))
                    .then_with(|| l_run.len().cmp(&r_run.len()));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                if l != r {
                    return l.cmp(&r);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut names = vec!["scan10.pcd", "scan2.pcd", "scan1.pcd", "a.pcd", "scan02.pcd"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["a.pcd", "scan1.pcd", "scan2.pcd", "scan02.pcd", "scan10.pcd"]);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(natural_cmp("cloud", "cloud1"), Ordering::Less);
        assert_eq!(natural_cmp("b1", "a2"), Ordering::Greater);
        assert_eq!(natural_cmp("x7y", "x7y"), Ordering::Equal);
    }
}
