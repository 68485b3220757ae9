use assert_cmd::Command;
use assert_cmd::cargo;
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::Server;
use predicates::prelude::*;
use std::io::prelude::*;
use tar::Builder;
use tempfile::tempdir;

fn create_tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

fn create_zip(files: &[(&str, &str)]) -> Vec<u8> {
    use zip::CompressionMethod;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options: FileOptions<()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, content) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

fn sdist_metadata(server_url: &str, name: &str, version: &str) -> String {
    format!(
        r#"{{
            "info": {{"name": "{name}", "version": "{version}"}},
            "last_serial": 1,
            "releases": {{
                "{version}": [
                    {{
                        "filename": "{name}-{version}.tar.gz",
                        "url": "{server_url}/packages/{name}-{version}.tar.gz",
                        "packagetype": "sdist",
                        "size": 1234,
                        "digests": {{"md5": "", "sha256": ""}}
                    }}
                ]
            }},
            "urls": []
        }}"#
    )
}

#[test]
fn test_end_to_end_fetch_sdist() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_metadata = server
        .mock("GET", "/pypi/hvac/0.10.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sdist_metadata(&url, "hvac", "0.10.1"))
        .create();

    let tar_gz_bytes = create_tar_gz(&[
        ("hvac-0.10.1/setup.py", "from setuptools import setup"),
        ("hvac-0.10.1/hvac/__init__.py", "__version__ = '0.10.1'"),
    ]);
    let _mock_download = server
        .mock("GET", "/packages/hvac-0.10.1.tar.gz")
        .with_status(200)
        .with_body(&tar_gz_bytes)
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "hvac==0.10.1\n# comment\n\n").unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("fetch")
        .arg(&manifest)
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert().success();

    // The wrapper directory has been flattened away
    assert_eq!(
        std::fs::read_to_string(dest_dir.path().join("setup.py")).unwrap(),
        "from setuptools import setup"
    );
    assert_eq!(
        std::fs::read_to_string(dest_dir.path().join("hvac/__init__.py")).unwrap(),
        "__version__ = '0.10.1'"
    );

    // The downloaded archive is kept under its remote filename
    assert!(dest_dir.path().join("hvac-0.10.1.tar.gz").exists());
}

#[test]
fn test_fetch_prefers_wheel_over_sdist() {
    let mut server = Server::new();
    let url = server.url();

    let metadata = format!(
        r#"{{
            "info": {{"name": "hvac", "version": "0.10.1"}},
            "releases": {{
                "0.10.1": [
                    {{
                        "filename": "hvac-0.10.1.tar.gz",
                        "url": "{url}/packages/hvac-0.10.1.tar.gz",
                        "packagetype": "sdist"
                    }},
                    {{
                        "filename": "hvac-0.10.1-py2.py3-none-any.whl",
                        "url": "{url}/packages/hvac-0.10.1-py2.py3-none-any.whl",
                        "packagetype": "bdist_wheel"
                    }}
                ]
            }},
            "urls": []
        }}"#
    );

    let _mock_metadata = server
        .mock("GET", "/pypi/hvac/0.10.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(metadata)
        .create();

    // Only the wheel may be downloaded
    let wheel_bytes = create_zip(&[
        ("hvac/__init__.py", "__version__ = '0.10.1'"),
        ("hvac-0.10.1.dist-info/METADATA", "Name: hvac"),
    ]);
    let mock_wheel = server
        .mock("GET", "/packages/hvac-0.10.1-py2.py3-none-any.whl")
        .with_status(200)
        .with_body(&wheel_bytes)
        .create();
    let mock_sdist = server
        .mock("GET", "/packages/hvac-0.10.1.tar.gz")
        .expect(0)
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "hvac==0.10.1\n").unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("fetch")
        .arg(&manifest)
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert().success();

    mock_wheel.assert();
    mock_sdist.assert();

    // Wheel contents are already flat; no wrapper to remove
    assert!(dest_dir.path().join("hvac/__init__.py").exists());
    assert!(dest_dir.path().join("hvac-0.10.1.dist-info/METADATA").exists());
}

#[test]
fn test_fetch_materializes_requirements_in_order() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_hvac = server
        .mock("GET", "/pypi/hvac/0.10.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sdist_metadata(&url, "hvac", "0.10.1"))
        .create();
    let _mock_requests = server
        .mock("GET", "/pypi/requests/2.25.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sdist_metadata(&url, "requests", "2.25.1"))
        .create();

    let hvac_bytes = create_tar_gz(&[("hvac-0.10.1/hvac/__init__.py", "hvac")]);
    let requests_bytes = create_tar_gz(&[("requests-2.25.1/requests/__init__.py", "requests")]);
    let _mock_hvac_dl = server
        .mock("GET", "/packages/hvac-0.10.1.tar.gz")
        .with_status(200)
        .with_body(&hvac_bytes)
        .create();
    let _mock_requests_dl = server
        .mock("GET", "/packages/requests-2.25.1.tar.gz")
        .with_status(200)
        .with_body(&requests_bytes)
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "hvac==0.10.1\n# comment\n\nrequests==2.25.1\n").unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("fetch")
        .arg(&manifest)
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert().success();

    assert!(dest_dir.path().join("hvac/__init__.py").exists());
    assert!(dest_dir.path().join("requests/__init__.py").exists());
}

#[test]
fn test_fetch_rerun_is_idempotent() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_metadata = server
        .mock("GET", "/pypi/hvac/0.10.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sdist_metadata(&url, "hvac", "0.10.1"))
        .expect(2)
        .create();

    let tar_gz_bytes = create_tar_gz(&[("hvac-0.10.1/hvac/__init__.py", "hvac")]);
    let _mock_download = server
        .mock("GET", "/packages/hvac-0.10.1.tar.gz")
        .with_status(200)
        .with_body(&tar_gz_bytes)
        .expect(2)
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "hvac==0.10.1\n").unwrap();

    for _ in 0..2 {
        let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
        cmd.arg("fetch")
            .arg(&manifest)
            .arg("--dest")
            .arg(dest_dir.path())
            .arg("--index-url")
            .arg(&url);
        cmd.assert().success();
    }

    assert_eq!(
        std::fs::read_to_string(dest_dir.path().join("hvac/__init__.py")).unwrap(),
        "hvac"
    );
}

#[test]
fn test_fetch_fails_on_unsupported_operator() {
    let mut server = Server::new();
    let url = server.url();

    // Parsing is all-or-nothing; the index must never be queried
    let mock_metadata = server
        .mock("GET", "/pypi/flask/json")
        .expect(0)
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "flask>=1.0\n").unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("fetch")
        .arg(&manifest)
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(">="));

    mock_metadata.assert();
}

#[test]
fn test_fetch_fails_when_no_artifact_available() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_metadata = server
        .mock("GET", "/pypi/ghost/1.0/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"info": {"name": "ghost", "version": "1.0"}, "releases": {"1.0": []}, "urls": []}"#,
        )
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "ghost==1.0\n").unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("fetch")
        .arg(&manifest)
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No distributable artifact found"));
}

#[test]
fn test_fetch_fails_when_metadata_missing() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_metadata = server
        .mock("GET", "/pypi/ghost/1.0/json")
        .with_status(404)
        .create();

    let dest_dir = tempdir().unwrap();
    let manifest_dir = tempdir().unwrap();
    let manifest = manifest_dir.path().join("requirements.txt");
    std::fs::write(&manifest, "ghost==1.0\n").unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("fetch")
        .arg(&manifest)
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_download_pinned_version_keeps_archive_packed() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_metadata = server
        .mock("GET", "/pypi/hvac/0.10.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sdist_metadata(&url, "hvac", "0.10.1"))
        .create();

    let tar_gz_bytes = create_tar_gz(&[("hvac-0.10.1/setup.py", "setup")]);
    let _mock_download = server
        .mock("GET", "/packages/hvac-0.10.1.tar.gz")
        .with_status(200)
        .with_body(&tar_gz_bytes)
        .create();

    let dest_dir = tempdir().unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("download")
        .arg("hvac")
        .arg("--version")
        .arg("0.10.1")
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert().success();

    // The archive is written but not unpacked
    assert!(dest_dir.path().join("hvac-0.10.1.tar.gz").exists());
    assert!(!dest_dir.path().join("setup.py").exists());
}

#[test]
fn test_download_latest_resolves_version_first() {
    let mut server = Server::new();
    let url = server.url();

    let _mock_latest = server
        .mock("GET", "/pypi/hvac/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"info": {"name": "hvac", "version": "0.10.1"}, "releases": {}, "urls": []}"#,
        )
        .create();
    let _mock_version = server
        .mock("GET", "/pypi/hvac/0.10.1/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(sdist_metadata(&url, "hvac", "0.10.1"))
        .create();

    let tar_gz_bytes = create_tar_gz(&[("hvac-0.10.1/setup.py", "setup")]);
    let _mock_download = server
        .mock("GET", "/packages/hvac-0.10.1.tar.gz")
        .with_status(200)
        .with_body(&tar_gz_bytes)
        .create();

    let dest_dir = tempdir().unwrap();

    let mut cmd = Command::new(cargo::cargo_bin!("pyri"));
    cmd.arg("download")
        .arg("hvac")
        .arg("--dest")
        .arg(dest_dir.path())
        .arg("--index-url")
        .arg(&url);

    cmd.assert().success();

    assert!(dest_dir.path().join("hvac-0.10.1.tar.gz").exists());
}
