//! CLI command definitions and handlers.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};

use crate::backend::GlusterBackend;
use crate::exec::SystemRunner;
use crate::filesystem::ProcMounts;
use crate::runtime::{DriverConfig, VolumeDriver};

/// gluvol - GlusterFS volume driver
#[derive(Parser, Debug)]
#[command(name = "gluvol")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base directory for mount points
    #[arg(
        short = 'b',
        long,
        global = true,
        env = "GLUVOL_ROOT",
        default_value = "/var/lib/docker-volumes/gluster"
    )]
    pub root: PathBuf,

    /// Directory holding the persisted state
    #[arg(
        long,
        global = true,
        env = "GLUVOL_STATE_DIR",
        default_value = "/etc/docker-volumes/gluster"
    )]
    pub state_dir: PathBuf,

    /// Name mount points after the remote volume so volumes sharing it share one mount
    #[arg(
        long,
        global = true,
        env = "MOUNT_UNIQ",
        action = ArgAction::Set,
        value_parser = parse_flag,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub mount_uniq: bool,

    /// GlusterFS client binary
    #[arg(long, global = true, default_value = "glusterfs")]
    pub binary: PathBuf,

    /// Enable debug logging
    #[arg(
        short = 'v',
        long,
        global = true,
        env = "DEBUG",
        action = ArgAction::Set,
        value_parser = parse_flag,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Volume commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a volume
    Create {
        /// Volume name
        name: String,

        /// Driver option (key=value), e.g. voluri=node-1,node-2:gv0
        #[arg(short, long = "opt", value_parser = parse_option)]
        opt: Vec<(String, String)>,
    },

    /// Display a volume as JSON
    Inspect {
        /// Volume name
        name: String,
    },

    /// List volumes
    Ls {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Only display volume names
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the mount point of a volume
    Path {
        /// Volume name
        name: String,
    },

    /// Attach a volume, mounting it if needed
    Mount {
        /// Volume name
        name: String,
    },

    /// Detach a volume, unmounting it on the last detach
    Unmount {
        /// Volume name
        name: String,
    },

    /// Remove a volume
    Rm {
        /// Volume name
        name: String,
    },

    /// Show driver capabilities
    Capabilities,

    /// Show version information
    Version,
}

impl Cli {
    /// Driver configuration described by the global flags.
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig::default()
            .with_mount_root(self.root.clone())
            .with_state_dir(self.state_dir.clone())
            .with_shared_mounts(self.mount_uniq)
    }

    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let driver = VolumeDriver::with_collaborators(
            self.driver_config(),
            std::sync::Arc::new(GlusterBackend::with_binary(self.binary.clone())),
            std::sync::Arc::new(SystemRunner::new()),
            std::sync::Arc::new(ProcMounts::new()),
        );

        match self.command {
            Commands::Create { name, opt } => {
                let options: HashMap<String, String> = opt.into_iter().collect();
                driver
                    .create(&name, Some(options))
                    .await
                    .map_err(|e| eyre!("Failed to create volume: {}", e))?;
                println!("{name}");
                Ok(())
            }

            Commands::Inspect { name } => {
                let info = driver
                    .get(&name)
                    .await
                    .map_err(|e| eyre!("Failed to inspect volume: {}", e))?;
                println!("{}", serde_json::to_string_pretty(&info)?);
                Ok(())
            }

            Commands::Ls { format, quiet } => {
                let volumes = driver
                    .list()
                    .await
                    .map_err(|e| eyre!("Failed to list volumes: {}", e))?;

                if quiet {
                    for volume in volumes {
                        println!("{}", volume.name);
                    }
                } else if format == "json" {
                    println!("{}", serde_json::to_string_pretty(&volumes)?);
                } else {
                    println!("NAME\tCONNECTIONS\tMOUNTPOINT");
                    for volume in volumes {
                        println!(
                            "{}\t{}\t{}",
                            volume.name,
                            volume.status.get("connections").cloned().unwrap_or_default(),
                            volume.mountpoint.display()
                        );
                    }
                }
                Ok(())
            }

            Commands::Path { name } => {
                let path = driver
                    .path(&name)
                    .await
                    .map_err(|e| eyre!("Failed to resolve volume: {}", e))?;
                println!("{}", path.display());
                Ok(())
            }

            Commands::Mount { name } => {
                let path = driver
                    .mount(&name)
                    .await
                    .map_err(|e| eyre!("Failed to mount volume: {}", e))?;
                println!("{}", path.display());
                Ok(())
            }

            Commands::Unmount { name } => {
                driver
                    .unmount(&name)
                    .await
                    .map_err(|e| eyre!("Failed to unmount volume: {}", e))?;
                println!("{name}");
                Ok(())
            }

            Commands::Rm { name } => {
                driver
                    .remove(&name)
                    .await
                    .map_err(|e| eyre!("Failed to remove volume: {}", e))?;
                println!("{name}");
                Ok(())
            }

            Commands::Capabilities => {
                println!("{}", serde_json::to_string_pretty(&driver.capabilities())?);
                Ok(())
            }

            Commands::Version => {
                println!("gluvol {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Split `key=value`.
fn parse_option(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

/// Accept `1`/`0` as well as `true`/`false`, like the `DEBUG` and
/// `MOUNT_UNIQ` environment variables are usually set.
fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MountNaming;

    #[test]
    fn parse_create_options() {
        let cli = Cli::try_parse_from([
            "gluvol",
            "create",
            "v1",
            "-o",
            "voluri=node-1:gv0",
            "--opt",
            "extra=a=b",
        ])
        .unwrap();

        match cli.command {
            Commands::Create { name, opt } => {
                assert_eq!(name, "v1");
                assert_eq!(
                    opt,
                    vec![
                        ("voluri".to_string(), "node-1:gv0".to_string()),
                        ("extra".to_string(), "a=b".to_string()),
                    ]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_option_without_value() {
        assert!(Cli::try_parse_from(["gluvol", "create", "v1", "-o", "voluri"]).is_err());
    }

    #[test]
    fn global_flags_build_config() {
        let cli = Cli::try_parse_from([
            "gluvol",
            "--root",
            "/srv/mounts",
            "--state-dir",
            "/srv/state",
            "--mount-uniq=1",
            "ls",
        ])
        .unwrap();

        let config = cli.driver_config();
        assert_eq!(config.paths.root, PathBuf::from("/srv/mounts"));
        assert_eq!(config.paths.state, PathBuf::from("/srv/state"));
        assert_eq!(config.naming, MountNaming::Target);
    }

    #[test]
    fn bare_flag_does_not_swallow_subcommand() {
        let cli = Cli::try_parse_from(["gluvol", "--mount-uniq", "ls"]).unwrap();
        assert!(cli.mount_uniq);
        assert!(matches!(cli.command, Commands::Ls { .. }));
    }

    #[test]
    fn flag_values() {
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("FALSE"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }
}
