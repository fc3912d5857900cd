#[cfg(test)]
mod tests {
    use app_config::AppConfig;
    use error_handler::{ConfigError, JsonErrorType};
    use std::io::Write;

    const SAMPLE: &str = r#"
        {
            "logger": {
                "log_level": "INFO",
                "log_destination": "both",
                "queue_capacity": 4096,
                "hex_dump_bytes_per_row": 16
            },
            "network": {
                "enable_relay": "yes",
                "server": { "enabled": true, "bind": "0.0.0.0:5000" },
                "client": { "enabled": false, "host": "127.0.0.1:6000" }
            },
            "threads": { "suppressed": ["FILE_READER", "CLIENT.SEND"] }
        }
    "#;

    #[test]
    fn test_sections_and_scalars() {
        let config = AppConfig::parse(SAMPLE).unwrap();

        assert!(config.has_section("logger"));
        assert_eq!(config.get_string("logger", "log_level", "DEBUG"), "INFO");
        assert_eq!(config.get_int("logger", "queue_capacity", 0), 4096);
        assert_eq!(config.get_u32("logger", "hex_dump_bytes_per_row", 32), 16);
    }

    #[test]
    fn test_nested_objects_become_dotted_keys() {
        let config = AppConfig::parse(SAMPLE).unwrap();

        assert_eq!(config.get("network", "server.bind"), Some("0.0.0.0:5000"));
        assert!(config.get_bool("network", "server.enabled", false));
        assert!(!config.get_bool("network", "client.enabled", true));
        assert!(config.get_bool("network", "enable_relay", false));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.get("LOGGER", "Log_Level"), Some("INFO"));
        assert_eq!(config.get("Network", "SERVER.BIND"), Some("0.0.0.0:5000"));
    }

    #[test]
    fn test_arrays_are_comma_joined() {
        let config = AppConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.get("threads", "suppressed"), Some("FILE_READER,CLIENT.SEND"));
    }

    #[test]
    fn test_defaults_for_missing_or_bad_values() {
        let config = AppConfig::parse(r#"{ "queues": { "capacity": "lots", "flag": "maybe", "port": 70000 } }"#).unwrap();

        assert_eq!(config.get_int("queues", "capacity", 100), 100);
        assert!(config.get_bool("queues", "flag", true));
        assert_eq!(config.get_u16("queues", "port", 5000), 5000);
        assert_eq!(config.get_string("queues", "missing", "fallback"), "fallback");
        assert_eq!(config.get_usize("nowhere", "capacity", 7), 7);
    }

    #[test]
    fn test_top_level_must_be_object() {
        assert_eq!(
            AppConfig::parse("[1, 2, 3]"),
            Err(ConfigError::Json(JsonErrorType::UnexpectedNode("array".to_string())))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.get("network", "client.host"), Some("127.0.0.1:6000"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(std::path::Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
