//! Shared helpers for registry integration tests.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;

/// Prefix the scenarios push to.
pub const PREFIX: &str = "registry.example.com/charts";

/// Provenance bytes used across tests.
pub const PROVENANCE: &[u8] = b"-----BEGIN PGP SIGNED MESSAGE-----\nname: demo\n";

/// Packages a chart directory holding `Chart.yaml` and a template.
pub fn package_chart(name: &str, version: &str) -> Vec<u8> {
    let chartfile = format!(
        "apiVersion: v2\nname: {name}\nversion: {version}\ndescription: A demo chart\n"
    );
    let chartfile_path = format!("{name}/Chart.yaml");
    let template_path = format!("{name}/templates/configmap.yaml");
    package(&[
        (chartfile_path.as_str(), chartfile.as_str()),
        (template_path.as_str(), "apiVersion: v1\nkind: ConfigMap\n"),
    ])
}

/// Builds a gzip-compressed tarball from `(path, contents)` pairs.
pub fn package(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
