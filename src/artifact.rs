//! Artifact paths
//!
//! Packages are expected at `/<package>/<package>-<version>-<revision>.x86_64.rpm`
//! inside the instance and are copied into `<base_dir>/pkg/<package>/<platform>/`
//! on the host. Nothing here touches the filesystem.

use serde::Serialize;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

/// Where an artifact lives in the instance and where it goes on the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLocation {
    /// `<instance>:<path>`, as the engine's copy subcommand expects it
    pub source: String,

    /// Host directory, with a trailing separator so the engine copies into it
    pub destination: String,
}

impl ArtifactLocation {
    pub fn destination_dir(&self) -> &Path {
        Path::new(&self.destination)
    }
}

/// `<package>-<version>-<revision>.x86_64.rpm`
pub fn artifact_file_name(package: &str, version: &str, revision: &str) -> String {
    format!("{}-{}-{}.x86_64.rpm", package, version, revision)
}

/// `<base_dir>/pkg/<package>/<platform>`
pub fn output_dir(base_dir: &Path, package: &str, platform: &str) -> PathBuf {
    base_dir.join("pkg").join(package).join(platform)
}

/// Computes the copy source and destination for one platform's artifact.
pub fn locate(
    package: &str,
    version: &str,
    revision: &str,
    platform: &str,
    instance: &str,
    base_dir: &Path,
) -> ArtifactLocation {
    let source = format!(
        "{}:/{}/{}",
        instance,
        package,
        artifact_file_name(package, version, revision)
    );

    let mut destination = output_dir(base_dir, package, platform)
        .display()
        .to_string();
    if !destination.ends_with(MAIN_SEPARATOR) {
        destination.push(MAIN_SEPARATOR);
    }

    ArtifactLocation {
        source,
        destination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate() {
        let location = locate("foo", "1.2", "3", "el7", "foo-abcd", Path::new("/opt/rpmbox"));
        assert_eq!(location.source, "foo-abcd:/foo/foo-1.2-3.x86_64.rpm");
        assert_eq!(location.destination, "/opt/rpmbox/pkg/foo/el7/");
        assert!(location.destination.ends_with("/pkg/foo/el7/"));
    }

    #[test]
    fn test_locate_is_pure() {
        let base = Path::new("/does/not/exist");
        let first = locate("foo", "1.2", "3", "el7", "foo-abcd", base);
        let second = locate("foo", "1.2", "3", "el7", "foo-abcd", base);
        assert_eq!(first, second);
        assert!(!base.exists());
    }

    #[test]
    fn test_versions_used_verbatim() {
        let location = locate("pkg", "2.0~rc1", "0.mine", "el6", "pkgX", Path::new("/b"));
        assert_eq!(location.source, "pkgX:/pkg/pkg-2.0~rc1-0.mine.x86_64.rpm");
    }

    #[test]
    fn test_destination_dir() {
        let location = locate("foo", "1", "0", "el5", "fooY", Path::new("/b"));
        assert_eq!(location.destination_dir(), Path::new("/b/pkg/foo/el5"));
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(
            artifact_file_name("collectd", "5.4.1", "1"),
            "collectd-5.4.1-1.x86_64.rpm"
        );
    }
}
