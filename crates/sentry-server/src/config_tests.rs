// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn cli_overrides_file() {
    let file = FileConfig {
        server: ServerSection { host: Some("0.0.0.0".to_owned()), port: Some(9000), ..Default::default() },
        ..Default::default()
    };
    let mut cli = CliConfig::default();
    cli.host = Some("127.0.0.1".to_owned());

    let resolved = ResolvedConfig::build(&cli, Some(&file));
    assert_eq!(resolved.host, "127.0.0.1");
    assert_eq!(resolved.port, 9000);
}

#[test]
fn falls_back_to_hardcoded_default() {
    let cli = CliConfig::default();
    let resolved = ResolvedConfig::build(&cli, None);
    assert_eq!(resolved.host, "127.0.0.1");
    assert_eq!(resolved.port, 8080);
    assert_eq!(resolved.log_paths, vec![PathBuf::from(".")]);
}

#[test]
fn short_password_rejected_when_auth_enabled() {
    let mut cli = CliConfig::default();
    cli.enable_auth = Some(true);
    cli.password = Some("abc".to_owned());
    let resolved = ResolvedConfig::build(&cli, None);
    assert!(resolved.validate().is_err());
}
