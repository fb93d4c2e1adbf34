use anyhow::{anyhow, Context};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

static PARTIAL_DOWNLOADS: AtomicUsize = AtomicUsize::new(0);

/// Where a section's data file lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    Url(String),
    Path(PathBuf),
}

impl DataSource {
    /// Resolve a file reference from the story config.
    ///
    /// Absolute URLs are kept as is. Other references are joined onto `base_url` when one is
    /// configured, otherwise they are read from disk relative to `base_dir`.
    pub fn resolve(reference: &str, base_url: Option<&str>, base_dir: &Path) -> Self {
        if is_url(reference) {
            return DataSource::Url(reference.to_owned());
        }
        match base_url {
            Some(base_url) if is_url(base_url) => DataSource::Url(format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                reference.trim_start_matches('/')
            )),
            Some(base_url) => DataSource::Path(
                base_dir
                    .join(base_url)
                    .join(reference.trim_start_matches('/')),
            ),
            None => DataSource::Path(base_dir.join(reference.trim_start_matches('/'))),
        }
    }

    /// Make the data available as a local file, downloading it into `data_dir` if needed.
    pub fn sync_to_file(&self, data_dir: &Path) -> anyhow::Result<PathBuf> {
        match self {
            DataSource::Path(path) => {
                if !path.exists() {
                    return Err(anyhow!("Data file {:?} not found", path));
                }
                Ok(path.clone())
            }
            DataSource::Url(url) => sync_url_to_file(url, data_dir),
        }
    }
}

fn is_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Local file name for a downloaded URL: a checksum of the full URL followed by its last path
/// segment, so same-named files from different places do not share a cache entry.
pub fn get_filename_for_url(url: &str) -> anyhow::Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let segment = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .ok_or_else(|| anyhow!("Cannot derive a file name from URL {}", url))?;
    Ok(format!("{:08x}_{}", crc32fast::hash(url.as_bytes()), segment))
}

pub fn download_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .user_agent("storymap")
        .build()?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Requesting {}", url))?;
    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("HTTP error! status: {} for {}", status.as_u16(), url));
    }
    Ok(response.bytes()?.to_vec())
}

/// Download `url` into `output_dir` unless it was fetched before. The data is written to a
/// partial file first and renamed into place, so the cached path only ever holds a whole file.
pub fn sync_url_to_file(url: &str, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let filename = get_filename_for_url(url)?;
    let output_filepath = output_dir.join(&filename);
    if output_filepath.exists() {
        log::info!(
            "Local file exists for {}: {:?}",
            url,
            output_filepath.canonicalize()
        );
        return Ok(output_filepath);
    }

    log::info!("Downloading {}", url);
    let data = download_bytes(url)?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Creating data dir {:?}", output_dir))?;
    let partial_filepath = output_dir.join(format!(
        ".{}.{}-{}.part",
        filename,
        std::process::id(),
        PARTIAL_DOWNLOADS.fetch_add(1, Ordering::Relaxed)
    ));
    fs::write(&partial_filepath, data)
        .with_context(|| format!("Could not write downloaded data to {:?}", partial_filepath))?;
    fs::rename(&partial_filepath, &output_filepath)
        .with_context(|| format!("Could not move download into {:?}", output_filepath))?;
    Ok(output_filepath)
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        path::{Path, PathBuf},
        thread,
    };

    use rstest::rstest;
    use testdir::testdir;

    use super::{get_filename_for_url, DataSource};

    /// Serve `requests` requests on a local port, answering each with the requested path.
    fn serve_request_paths(requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    if header.trim().is_empty() {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("");
                let body = format!("{{\"served_path\": \"{}\"}}", path);
                write!(
                    stream,
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                )
                .unwrap();
            }
        });
        format!("http://{}", address)
    }

    #[rstest]
    #[case("https://example.org/data/CLIMA.geojson", None, DataSource::Url("https://example.org/data/CLIMA.geojson".into()))]
    #[case("/CLIMA.geojson", Some("https://example.org/public/"), DataSource::Url("https://example.org/public/CLIMA.geojson".into()))]
    #[case("/CLIMA.geojson", None, DataSource::Path(PathBuf::from("/story/CLIMA.geojson")))]
    #[case("CLIMA.geojson", Some("public"), DataSource::Path(PathBuf::from("/story/public/CLIMA.geojson")))]
    fn test_resolve(
        #[case] reference: &str,
        #[case] base_url: Option<&str>,
        #[case] expected: DataSource,
    ) {
        assert_eq!(expected, DataSource::resolve(reference, base_url, Path::new("/story")));
    }

    #[rstest]
    #[case("https://example.org/rasters/agave_4326.tif", "_agave_4326.tif")]
    #[case("https://example.org/rasters/agave.tif?version=2", "_agave.tif")]
    #[case("https://example.org/a/b.geojson#frag", "_b.geojson")]
    fn test_get_filename_for_url(#[case] url: &str, #[case] expected_suffix: &str) {
        let filename = get_filename_for_url(url).unwrap();
        assert!(filename.ends_with(expected_suffix), "{}", filename);
        assert_eq!(8 + expected_suffix.len(), filename.len());
    }

    #[test]
    fn test_same_named_urls_get_distinct_files() {
        let filenames = [
            "https://example.org/2010/CLIMA.geojson",
            "https://example.org/2020/CLIMA.geojson",
            "https://example.org/2020/CLIMA.geojson?v=2",
        ]
        .map(|url| get_filename_for_url(url).unwrap());
        assert_ne!(filenames[0], filenames[1]);
        assert_ne!(filenames[1], filenames[2]);
        assert_eq!(
            filenames[0],
            get_filename_for_url("https://example.org/2010/CLIMA.geojson").unwrap()
        );
    }

    #[test]
    fn test_get_filename_for_bare_host_fails() {
        assert!(get_filename_for_url("https://").is_err());
    }

    #[test]
    fn test_sync_local_path() {
        let dir = testdir!();
        let existing = dir.join("MARGINACION.geojson");
        std::fs::write(&existing, "{}").unwrap();
        assert_eq!(
            existing,
            DataSource::Path(existing.clone()).sync_to_file(&dir).unwrap()
        );
        assert!(DataSource::Path(dir.join("missing.geojson"))
            .sync_to_file(&dir)
            .is_err());
    }

    #[test]
    fn test_sync_url_reuses_cached_file() {
        let dir = testdir!();
        let url = "http://127.0.0.1:9/CUS_cambios.geojson";
        let cached = dir.join(get_filename_for_url(url).unwrap());
        fs::write(&cached, "{}").unwrap();
        let source = DataSource::Url(url.into());
        assert_eq!(cached, source.sync_to_file(&dir).unwrap());
    }

    #[test]
    fn test_sync_same_named_urls_keeps_each_download() {
        let dir = testdir!();
        let base_url = serve_request_paths(2);
        let first = DataSource::Url(format!("{}/2010/CLIMA.geojson", base_url));
        let second = DataSource::Url(format!("{}/2020/CLIMA.geojson", base_url));

        let first_path = first.sync_to_file(&dir).unwrap();
        let second_path = second.sync_to_file(&dir).unwrap();
        assert_ne!(first_path, second_path);
        assert!(fs::read_to_string(&first_path)
            .unwrap()
            .contains("/2010/CLIMA.geojson"));
        assert!(fs::read_to_string(&second_path)
            .unwrap()
            .contains("/2020/CLIMA.geojson"));

        // The server is gone, so this only succeeds from the cache.
        assert_eq!(first_path, first.sync_to_file(&dir).unwrap());
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
