//! Pipeline name to rerun command mapping
//!
//! The CI bot listens for `run <suite>` comments. The keyword table is checked
//! in declaration order and the first substring match wins, so more specific
//! keywords that share a substring with an earlier one never take precedence.

/// Ordered `(keyword, command)` pairs, matched against the lowercased name
pub const PIPELINE_KEYWORDS: &[(&str, &str)] = &[
    ("compile", "run compile"),
    ("doris_compile", "run compile"),
    ("fe ut", "run feut"),
    ("fe_ut", "run feut"),
    ("be ut", "run beut"),
    ("be_ut", "run beut"),
    ("p0", "run p0"),
    ("cloud_p0", "run cloud_p0"),
    ("vault_p0", "run cloud_p0"),
    ("performance", "run performance"),
    ("external", "run external"),
    ("nonconcurrent", "run nonConcurrent"),
    ("non-concurrent", "run nonConcurrent"),
    ("p1", "run p1"),
    ("coverage", "run coverage"),
    ("buildall", "run buildall"),
];

/// Commands offered to users, in display order
pub const COMMAND_CHOICES: &[&str] = &[
    "run compile",
    "run feut",
    "run beut",
    "run p0",
    "run p1",
    "run cloud_p0",
    "run performance",
    "run external",
    "run nonConcurrent",
    "run coverage",
    "run buildall",
];

/// Suggest the rerun command for a pipeline name (case-insensitive)
pub fn suggest_command(name: Option<&str>) -> Option<&'static str> {
    let lowered = name.filter(|n| !n.is_empty())?.to_lowercase();
    PIPELINE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, command)| *command)
}
