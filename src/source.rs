use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{WifiOptError, WifiOptResult};
use crate::profiler::ProfilerParser;
use crate::snapshot::Snapshot;

pub const DEFAULT_PROFILER_COMMAND: &str = "/usr/sbin/system_profiler";
pub const DEFAULT_PROFILER_ARGS: [&str; 1] = ["SPAirPortDataType"];

/// Anything that can produce a point-in-time scan.
pub trait NetworkSource {
    fn name(&self) -> &str;
    fn scan(&self) -> WifiOptResult<Snapshot>;
}

/// Reads a serialized [`Snapshot`] from disk.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl NetworkSource for JsonFileSource {
    fn name(&self) -> &str {
        "json"
    }

    fn scan(&self) -> WifiOptResult<Snapshot> {
        debug!("Reading snapshot from {}", self.path.display());
        let content = std::fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }
}

enum ProfilerInput {
    Command { program: PathBuf, args: Vec<String> },
    Dump(PathBuf),
}

/// Parses `system_profiler` output, either live or from a saved dump.
pub struct ProfilerSource {
    input: ProfilerInput,
}

impl ProfilerSource {
    pub fn command(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            input: ProfilerInput::Command {
                program: program.into(),
                args,
            },
        }
    }

    pub fn dump(path: impl Into<PathBuf>) -> Self {
        Self {
            input: ProfilerInput::Dump(path.into()),
        }
    }

    fn read_output(&self) -> WifiOptResult<String> {
        match &self.input {
            ProfilerInput::Dump(path) => Ok(std::fs::read_to_string(path)?),
            ProfilerInput::Command { program, args } => {
                debug!("Running {} {}", program.display(), args.join(" "));
                let output = Command::new(program).args(args).output().map_err(|e| {
                    WifiOptError::SourceUnavailable(format!("{}: {}", program.display(), e))
                })?;
                if !output.status.success() {
                    return Err(WifiOptError::CommandFailed(format!(
                        "{} exited with {}: {}",
                        program.display(),
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    )));
                }
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
        }
    }
}

impl NetworkSource for ProfilerSource {
    fn name(&self) -> &str {
        "system_profiler"
    }

    fn scan(&self) -> WifiOptResult<Snapshot> {
        let output = self.read_output()?;
        let report = ProfilerParser::parse(&output);
        debug!("system_profiler reported {} networks", report.networks.len());
        Ok(report.into_snapshot())
    }
}

/// Uses `primary` unless it fails or sees no networks, then `secondary`.
pub struct FallbackSource {
    primary: Box<dyn NetworkSource + Send + Sync>,
    secondary: Box<dyn NetworkSource + Send + Sync>,
}

impl FallbackSource {
    pub fn new(
        primary: Box<dyn NetworkSource + Send + Sync>,
        secondary: Box<dyn NetworkSource + Send + Sync>,
    ) -> Self {
        Self { primary, secondary }
    }
}

impl NetworkSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    fn scan(&self) -> WifiOptResult<Snapshot> {
        match self.primary.scan() {
            Ok(snapshot) if !snapshot.networks.is_empty() => {
                debug!("Snapshot served by {}", self.primary.name());
                return Ok(snapshot);
            }
            Ok(_) => info!(
                "{} returned no networks, falling back to {}",
                self.primary.name(),
                self.secondary.name()
            ),
            Err(e) => warn!(
                "{} failed ({}), falling back to {}",
                self.primary.name(),
                e,
                self.secondary.name()
            ),
        }
        self.secondary.scan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Band, ObservedNetwork};

    struct FixedSource(WifiOptResult<Snapshot>);

    impl NetworkSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn scan(&self) -> WifiOptResult<Snapshot> {
            match &self.0 {
                Ok(snapshot) => Ok(snapshot.clone()),
                Err(e) => Err(WifiOptError::SourceUnavailable(e.to_string())),
            }
        }
    }

    fn one_network() -> Snapshot {
        Snapshot::new(vec![ObservedNetwork::new("a", -50, -90, 1, Band::TwoPointFourGHz)], None)
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wifiopt-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_fallback_prefers_primary() {
        let source = FallbackSource::new(
            Box::new(FixedSource(Ok(one_network()))),
            Box::new(FixedSource(Ok(Snapshot::new(Vec::new(), None)))),
        );
        assert_eq!(source.scan().unwrap().networks.len(), 1);
    }

    #[test]
    fn test_fallback_on_empty_primary() {
        let source = FallbackSource::new(
            Box::new(FixedSource(Ok(Snapshot::new(Vec::new(), None)))),
            Box::new(FixedSource(Ok(one_network()))),
        );
        assert_eq!(source.scan().unwrap().networks.len(), 1);
    }

    #[test]
    fn test_fallback_on_primary_error() {
        let source = FallbackSource::new(
            Box::new(FixedSource(Err(WifiOptError::SourceUnavailable("down".into())))),
            Box::new(FixedSource(Ok(one_network()))),
        );
        assert_eq!(source.scan().unwrap().networks.len(), 1);
    }

    #[test]
    fn test_json_file_source() {
        let path = temp_path("snapshot.json");
        std::fs::write(&path, serde_json::to_string(&one_network()).unwrap()).unwrap();

        let snapshot = JsonFileSource::new(&path).scan().unwrap();
        assert_eq!(snapshot.networks[0].id, "a");

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_json_file_is_error() {
        let source = JsonFileSource::new(temp_path("missing.json"));
        assert!(matches!(source.scan(), Err(WifiOptError::Io(_))));
    }

    #[test]
    fn test_profiler_dump_source() {
        let path = temp_path("profiler.txt");
        std::fs::write(
            &path,
            "          Other Local Wi-Fi Networks:\n            Net:\n              Channel: 44 (5GHz, 80MHz)\n              Signal / Noise: -61 dBm / -93 dBm\n",
        )
        .unwrap();

        let snapshot = ProfilerSource::dump(&path).scan().unwrap();
        assert_eq!(snapshot.networks.len(), 1);
        assert_eq!(snapshot.networks[0].channel, 44);
        assert!(snapshot.interface.is_none());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_profiler_binary() {
        let source = ProfilerSource::command("/nonexistent/system_profiler", Vec::new());
        assert!(matches!(source.scan(), Err(WifiOptError::SourceUnavailable(_))));
    }
}
