//! Column rename detection
//!
//! Pairs removed and added columns of one table when enough independent
//! evidence says they are the same column under a new name. Scores are
//! additive; weights and the acceptance threshold come from [`RenameConfig`].

use crate::config::RenameConfig;
use crate::schema::diff::ColumnRename;
use crate::schema::types::Column;

/// Tokens shorter than this are too common to count as evidence
pub const MIN_SHARED_TOKEN_LEN: usize = 3;

/// Result of splitting removed/added columns into renames and leftovers
#[derive(Debug, Clone, Default)]
pub struct DetectedRenames {
    pub renames: Vec<ColumnRename>,
    pub removed: Vec<Column>,
    pub added: Vec<Column>,
}

/// Lower-cased `_`-separated name tokens, short tokens dropped
pub fn name_tokens(name: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in name.trim().to_lowercase().split('_') {
        if token.chars().count() >= MIN_SHARED_TOKEN_LEN && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

fn shared_tokens<'a>(old: &'a [String], new: &[String]) -> Vec<&'a String> {
    old.iter().filter(|t| new.contains(t)).collect()
}

fn same_type(old: &Column, new: &Column) -> bool {
    let squash = |raw: &str| -> String {
        raw.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
    };
    old.data_type == new.data_type && squash(&old.type_raw) == squash(&new.type_raw)
}

fn same_comment(old: &Column, new: &Column) -> bool {
    !old.comment.trim().is_empty() && old.comment.trim() == new.comment.trim()
}

fn same_generation(old: &Column, new: &Column) -> bool {
    old.is_generated
        && new.is_generated
        && !old.generation_expression.trim().is_empty()
        && old.generation_expression.trim() == new.generation_expression.trim()
}

/// Whether a pair may be considered at all: same type plus some evidence
pub fn is_valid_rename(old: &Column, new: &Column) -> bool {
    if old.name.eq_ignore_ascii_case(&new.name) || !same_type(old, new) {
        return false;
    }

    let old_tokens = name_tokens(&old.name);
    let new_tokens = name_tokens(&new.name);
    !shared_tokens(&old_tokens, &new_tokens).is_empty()
        || same_comment(old, new)
        || same_generation(old, new)
}

/// Additive similarity score; zero for identical names
pub fn rename_score(old: &Column, new: &Column, weights: &RenameConfig) -> u32 {
    let old_name = old.name.trim().to_lowercase();
    let new_name = new.name.trim().to_lowercase();
    if old_name == new_name {
        return 0;
    }

    let mut score = 0;
    if same_type(old, new) {
        score += weights.same_type;
    }

    let old_tokens = name_tokens(&old_name);
    let new_tokens = name_tokens(&new_name);
    score += weights.shared_token * shared_tokens(&old_tokens, &new_tokens).len() as u32;
    if matches!((old_tokens.first(), new_tokens.first()), (Some(a), Some(b)) if a == b) {
        score += weights.first_token;
    }

    let prefix = old_name
        .chars()
        .zip(new_name.chars())
        .take_while(|(a, b)| a == b)
        .count() as u32;
    score += (prefix * weights.prefix_char).min(weights.prefix_cap);

    if same_comment(old, new) {
        score += weights.comment;
    }
    if same_generation(old, new) {
        score += weights.generation_expression;
    }
    if old.nullable == new.nullable {
        score += weights.nullable;
    }
    if old.default_value == new.default_value {
        score += weights.default_value;
    }

    score
}

/// Pair removed and added columns into renames
///
/// Both lists must be in declaration order. Candidates are accepted best
/// score first; ties go to the earlier removed column, then the earlier
/// added column. A column takes part in at most one rename.
pub fn detect_renames(
    removed: Vec<Column>,
    added: Vec<Column>,
    weights: &RenameConfig,
) -> DetectedRenames {
    let mut candidates: Vec<(u32, usize, usize)> = Vec::new();
    for (i, old) in removed.iter().enumerate() {
        for (j, new) in added.iter().enumerate() {
            if !is_valid_rename(old, new) {
                continue;
            }
            let score = rename_score(old, new, weights);
            if score >= weights.threshold {
                candidates.push((score, i, j));
            }
        }
    }
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

    let mut old_used = vec![false; removed.len()];
    let mut new_used = vec![false; added.len()];
    let mut pairs = Vec::new();
    for (score, i, j) in candidates {
        if old_used[i] || new_used[j] {
            continue;
        }
        old_used[i] = true;
        new_used[j] = true;
        pairs.push((score, i, j));
    }

    let renames = pairs
        .iter()
        .map(|&(score, i, j)| {
            tracing::debug!(
                from = %removed[i].name,
                to = %added[j].name,
                score,
                "Detected column rename"
            );
            ColumnRename {
                old: removed[i].clone(),
                new: added[j].clone(),
                score,
            }
        })
        .collect();

    DetectedRenames {
        renames,
        removed: removed
            .into_iter()
            .zip(old_used)
            .filter_map(|(c, used)| (!used).then_some(c))
            .collect(),
        added: added
            .into_iter()
            .zip(new_used)
            .filter_map(|(c, used)| (!used).then_some(c))
            .collect(),
    }
}
