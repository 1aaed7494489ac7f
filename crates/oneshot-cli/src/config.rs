//! Configuration loading helpers for the `oneshot` CLI.
//!
//! Leading configuration flags are split off the argument list and handed to
//! `ortho_config`; everything after them belongs to the operation layer.

use std::ffi::{OsStr, OsString};

use oneshot_config::Config;
use ortho_config::OrthoConfig;

use crate::errors::AppError;

/// CLI flags recognised by the configuration loader.
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--log-filter", "--log-format"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before any operation tokens. Later
    /// occurrences are forwarded to the engine parameter parser.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        if !argument_text.starts_with("--") {
            return FlagAction::Skip;
        }

        let mut flag_parts = argument_text.splitn(2, '=');
        let flag = flag_parts.next().unwrap_or_default();
        let has_inline_value = flag_parts.next().is_some();

        if CONFIG_CLI_FLAGS.contains(&flag) {
            return FlagAction::Include {
                needs_value: !has_inline_value,
            };
        }

        FlagAction::Skip
    }
}

#[derive(Debug)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered = vec![program.clone()];
    let mut command_start = 1_usize;
    let mut pending_value = false;

    for argument in args.iter().skip(1) {
        if pending_value {
            filtered.push(argument.clone());
            pending_value = false;
            command_start += 1;
            continue;
        }

        match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                command_start += 1;
                pending_value = needs_value;
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn loader_falls_back_to_defaults_without_sources() {
        let config = OrthoConfigLoader
            .load(&os_args(&["oneshot"]))
            .expect("load defaults");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn loader_applies_leading_flags() {
        let config = OrthoConfigLoader
            .load(&os_args(&["oneshot", "--log-filter", "debug"]))
            .expect("load with flag");
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn inline_value_flags_do_not_need_follow_up_value() {
        let result = OrthoConfigLoader::process_config_flag(OsStr::new("--log-filter=debug"));
        match result {
            FlagAction::Include { needs_value } => assert!(!needs_value),
            FlagAction::Skip => panic!("expected include for known inline flag"),
        }
    }

    #[test]
    fn operation_flags_are_not_configuration() {
        let result = OrthoConfigLoader::process_config_flag(OsStr::new("--text"));
        assert!(matches!(result, FlagAction::Skip), "should skip");
    }

    #[rstest]
    #[case(&["oneshot", "chat"], 1, 1)]
    #[case(&["oneshot", "--log-filter", "debug", "chat"], 3, 3)]
    #[case(&["oneshot", "--log-format=json", "--config-path", "c.toml", "chat"], 4, 4)]
    #[case(&["oneshot", "chat", "--log-filter", "debug"], 1, 1)]
    fn leading_configuration_flags_are_split_off(
        #[case] args: &[&str],
        #[case] config_len: usize,
        #[case] command_start: usize,
    ) {
        let split = split_config_arguments(&os_args(args));
        assert_eq!(split.config_arguments.len(), config_len);
        assert_eq!(split.command_start, command_start);
    }

    #[test]
    fn empty_argument_list_yields_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert_eq!(split.command_start, 0);
    }
}
