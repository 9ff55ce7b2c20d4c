//! Tests for checksum manifest lookup.

use super::*;
use crate::artefact::manifest_parser::parse_manifest;
use rstest::{fixture, rstest};

const ASSET: &str = "codexline-linux-x64";

fn digest(fill: char) -> Sha256Digest {
    Sha256Digest::try_from(fill.to_string().repeat(64)).expect("valid digest")
}

#[fixture]
fn release_manifest() -> ChecksumManifest {
    parse_manifest(&format!(
        concat!(
            "{win}  codexline-win32-x64.exe\n",
            "{linux}  codexline-linux-x64\n",
            "{arm}  codexline-linux-arm64\n",
        ),
        win = "1".repeat(64),
        linux = "2".repeat(64),
        arm = "3".repeat(64),
    ))
}

#[rstest]
fn finds_exact_filename(release_manifest: ChecksumManifest) {
    assert_eq!(release_manifest.lookup(ASSET), Some(&digest('2')));
}

#[rstest]
fn does_not_match_on_prefix(release_manifest: ChecksumManifest) {
    assert_eq!(release_manifest.lookup("codexline-linux"), None);
}

#[rstest]
#[case::unix_path("subdir/codexline-linux-x64")]
#[case::nested_path("target/release/codexline-linux-x64")]
#[case::windows_path("dist\\codexline-linux-x64")]
fn matches_path_qualified_entries_by_basename(#[case] filename: &str) {
    let manifest = parse_manifest(&format!("{} *{filename}", "d".repeat(64)));
    assert_eq!(manifest.lookup(ASSET), Some(&digest('d')));
}

#[test]
fn missing_asset_is_reported() {
    let manifest = parse_manifest(&format!("{} codexline-darwin-x64", "e".repeat(64)));
    assert_eq!(manifest.lookup(ASSET), None);
}

#[test]
fn empty_manifest_has_no_records() {
    let manifest = parse_manifest("\n\n");
    assert!(manifest.is_empty());
    assert_eq!(manifest.lookup(ASSET), None);
}

#[test]
fn first_matching_record_wins() {
    let manifest = parse_manifest(&format!(
        "{a} {ASSET}\n{b} mirror/{ASSET}\n",
        a = "a".repeat(64),
        b = "b".repeat(64),
    ));
    assert_eq!(manifest.lookup(ASSET), Some(&digest('a')));
}

#[test]
fn exact_and_basename_matches_share_precedence() {
    let manifest = parse_manifest(&format!(
        "{a} build/{ASSET}\n{b} {ASSET}\n",
        a = "a".repeat(64),
        b = "b".repeat(64),
    ));
    assert_eq!(manifest.lookup(ASSET), Some(&digest('a')));
}

#[rstest]
#[case::agreeing('a', 'a', 0)]
#[case::disagreeing('a', 'b', 1)]
fn conflicting_digests_flags_disagreement(
    #[case] first: char,
    #[case] second: char,
    #[case] expected: usize,
) {
    let manifest = parse_manifest(&format!(
        "{a} {ASSET}\n{b} dist/{ASSET}\n{b} {ASSET}\n",
        a = first.to_string().repeat(64),
        b = second.to_string().repeat(64),
    ));
    let conflicts = manifest.conflicting_digests(ASSET);
    assert_eq!(conflicts.len(), expected);
    assert_eq!(manifest.lookup(ASSET), Some(&digest(first)));
}

#[rstest]
fn conflicting_digests_is_empty_for_unknown_asset(release_manifest: ChecksumManifest) {
    assert!(release_manifest.conflicting_digests("codexline-darwin-x64").is_empty());
}

#[test]
fn basename_ignores_directories() {
    let record = ManifestRecord::new(digest('0'), "a/b/codexline-darwin-arm64");
    assert_eq!(record.basename(), "codexline-darwin-arm64");
    assert!(record.matches("codexline-darwin-arm64"));
    assert!(record.matches("a/b/codexline-darwin-arm64"));
    assert!(!record.matches("b/codexline-darwin-arm64"));
}
