use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One package record as returned by the index JSON API.
///
/// The wire shape is the PyPI JSON API: `info`, `last_serial`, `releases`
/// (version string to list of downloadable files), and `urls` (the files of
/// the record's own version).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Package {
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub last_serial: i64,
    #[serde(default)]
    pub releases: HashMap<String, Vec<Release>>,
    #[serde(default)]
    pub urls: Vec<Release>,
}

/// Project-level metadata. `name` and `version` (the latest release) are the
/// fields the pipeline reads; the rest is carried from the wire format.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Info {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub requires_python: Option<String>,
}

/// Distribution kind of a release file.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageType {
    #[serde(rename = "bdist_wheel")]
    Wheel,
    #[serde(rename = "sdist")]
    Sdist,
    #[default]
    #[serde(other)]
    Other,
}

/// Digests published alongside a release file. Not verified by this tool.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Digests {
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub sha256: String,
}

/// One downloadable file for a given version.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Release {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "packagetype")]
    pub package_type: PackageType,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digests: Digests,
    #[serde(default)]
    pub md5_digest: String,
    #[serde(default)]
    pub python_version: String,
    #[serde(default)]
    pub yanked: bool,
    #[serde(default)]
    pub yanked_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_package_record() {
        let body = r#"{
            "info": {"name": "hvac", "version": "0.10.1", "summary": "HashiCorp Vault client"},
            "last_serial": 123456,
            "releases": {
                "0.10.1": [
                    {
                        "filename": "hvac-0.10.1-py2.py3-none-any.whl",
                        "url": "https://files.example/hvac-0.10.1-py2.py3-none-any.whl",
                        "packagetype": "bdist_wheel",
                        "size": 116391,
                        "digests": {"md5": "abc", "sha256": "def"},
                        "yanked": false
                    },
                    {
                        "filename": "hvac-0.10.1.tar.gz",
                        "url": "https://files.example/hvac-0.10.1.tar.gz",
                        "packagetype": "sdist",
                        "size": 117343,
                        "digests": {"md5": "ghi", "sha256": "jkl"},
                        "yanked": false
                    }
                ]
            },
            "urls": []
        }"#;

        let package: Package = serde_json::from_str(body).unwrap();
        assert_eq!(package.info.name, "hvac");
        assert_eq!(package.info.version, "0.10.1");
        assert_eq!(package.last_serial, 123456);

        let files = &package.releases["0.10.1"];
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].package_type, PackageType::Wheel);
        assert_eq!(files[1].package_type, PackageType::Sdist);
        assert_eq!(files[1].digests.sha256, "jkl");
    }

    #[test]
    fn test_unknown_packagetype_maps_to_other() {
        let body = r#"{"filename": "x.egg", "url": "u", "packagetype": "bdist_egg"}"#;
        let release: Release = serde_json::from_str(body).unwrap();
        assert_eq!(release.package_type, PackageType::Other);
    }

    #[test]
    fn test_missing_fields_default() {
        let package: Package = serde_json::from_str("{}").unwrap();
        assert!(package.info.name.is_empty());
        assert!(package.releases.is_empty());
        assert!(package.urls.is_empty());
    }
}
