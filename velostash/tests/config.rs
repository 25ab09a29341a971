use std::io::Write;

use tempfile::NamedTempFile;
use velostash::{ConfigError, DAY_MILLIS, GatewayConfig};

#[test]
fn test_partial_file_keeps_defaults() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
default_quota_bytes = 1048576

[cleanup]
completed_rental_grace_days = 3

[admin]
email = "ops@example.org"
password = "hunter2"
"#
    )?;

    let config = GatewayConfig::from_toml_file(file.path())?;
    assert_eq!(config.default_quota_bytes, 1_048_576);
    assert_eq!(config.cleanup.completed_rental_grace_millis(), 3 * DAY_MILLIS);
    assert_eq!(config.cleanup.stale_bike_age_days, 365);
    assert_eq!(config.admin.email, "ops@example.org");
    assert_eq!(config.admin.name, "Admin");
    assert_eq!(config.compression.max_dimension, 800);
    Ok(())
}

#[test]
fn test_missing_file_is_an_io_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let result = GatewayConfig::from_toml_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
    Ok(())
}

#[test]
fn test_empty_admin_password_is_rejected() {
    let result = GatewayConfig::from_toml_str("[admin]\npassword = \"\"\n");
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
