use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use ureq::Agent;

/// Downloads a `.tar.gz` archive and unpacks it into `dest`.
pub trait Fetcher {
    fn fetch_archive(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Upper bound on one download, connect through the last body byte.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn agent(&self) -> Agent {
        Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .into()
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::with_timeout(DOWNLOAD_TIMEOUT)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_archive(&self, url: &str, dest: &Path) -> Result<()> {
        info!(url, dest = %dest.display(), "downloading archive");
        let response = self
            .agent()
            .get(url)
            .call()
            .with_context(|| format!("Downloading {url}"))?;
        unpack_tar_gz(response.into_body().into_reader(), dest)
            .with_context(|| format!("Extracting {url} into {}", dest.display()))
    }
}

pub fn unpack_tar_gz(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    archive.unpack(dest)?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn xml_tarball() -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let body = b"<doxygenindex/>";
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "xml/index.xml", &body[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_unpack_tar_gz() {
        let dest = tempfile::tempdir().unwrap();
        unpack_tar_gz(xml_tarball().as_slice(), dest.path()).unwrap();
        let extracted = std::fs::read_to_string(dest.path().join("xml/index.xml")).unwrap();
        assert_eq!(extracted, "<doxygenindex/>");
    }

    #[test]
    fn test_stalled_server_times_out() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            // accept, then never answer
            let _conn = listener.accept();
            std::thread::sleep(Duration::from_secs(30));
        });
        let dest = tempfile::tempdir().unwrap();

        let started = std::time::Instant::now();
        let err = HttpFetcher::with_timeout(Duration::from_millis(300))
            .fetch_archive(&format!("http://127.0.0.1:{port}/xml.tar.gz"), dest.path())
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(format!("{err:#}").contains("Downloading"));
    }

    #[test]
    fn test_unpack_rejects_non_gzip() {
        let dest = tempfile::tempdir().unwrap();
        assert!(unpack_tar_gz(&b"<html>404</html>"[..], dest.path()).is_err());
    }
}
