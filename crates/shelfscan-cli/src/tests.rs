use super::*;

use shelfscan_core::{SiteConfig, SitesFile};

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["shelfscan"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn run_defaults_to_all_sites() {
    let cli = Cli::try_parse_from(["shelfscan", "run"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Run {
            ref sites,
            force: false,
            limit: None,
            dry_run: false,
        }) if sites.is_empty()
    ));
}

#[test]
fn run_accepts_repeated_sites_and_flags() {
    let cli = Cli::try_parse_from([
        "shelfscan",
        "run",
        "--site",
        "acme",
        "--site",
        "globex",
        "--force",
        "--limit",
        "25",
        "--dry-run",
    ])
    .expect("expected valid cli args");
    match cli.command {
        Some(Commands::Run {
            sites,
            force,
            limit,
            dry_run,
        }) => {
            assert_eq!(sites, vec!["acme".to_string(), "globex".to_string()]);
            assert!(force);
            assert_eq!(limit, Some(25));
            assert!(dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn audit_accepts_repeated_sites() {
    let cli = Cli::try_parse_from(["shelfscan", "audit", "--site", "acme", "--site", "globex"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Audit { ref sites }) if sites == &["acme", "globex"]
    ));
    let cli = Cli::try_parse_from(["shelfscan", "audit"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Audit { ref sites }) if sites.is_empty()));
}

#[test]
fn run_rejects_non_numeric_limit() {
    let result = Cli::try_parse_from(["shelfscan", "run", "--limit", "lots"]);
    assert!(result.is_err());
}

#[test]
fn parses_classify_command() {
    let cli = Cli::try_parse_from(["shelfscan", "classify", "data/html/acme/123.html"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Classify { ref file }) if file == &PathBuf::from("data/html/acme/123.html")
    ));
}

#[test]
fn classify_requires_a_file() {
    assert!(Cli::try_parse_from(["shelfscan", "classify"]).is_err());
}

#[test]
fn investigate_defaults_to_five_samples() {
    let cli = Cli::try_parse_from(["shelfscan", "investigate", "--site", "acme"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Investigate { ref site, samples: 5 }) if site == "acme"
    ));
}

#[test]
fn investigate_requires_site() {
    assert!(Cli::try_parse_from(["shelfscan", "investigate"]).is_err());
}

fn sites_file() -> SitesFile {
    SitesFile {
        sites: vec![
            SiteConfig::new("acme", "https://acme.test"),
            SiteConfig::new("globex", "https://globex.test"),
        ],
    }
}

#[test]
fn select_sites_without_filter_returns_all() {
    let selected = select_sites(&sites_file(), &[]).expect("selection should succeed");
    assert_eq!(selected.len(), 2);
}

#[test]
fn select_sites_matches_ids_case_insensitively() {
    let selected =
        select_sites(&sites_file(), &["GLOBEX".to_string()]).expect("selection should succeed");
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].id, "globex");
}

#[test]
fn select_sites_rejects_unknown_id() {
    let err = select_sites(&sites_file(), &["initech".to_string()])
        .expect_err("unknown site should fail");
    assert!(err.to_string().contains("initech"));
}
