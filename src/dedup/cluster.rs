//! Greedy single-link grouping of near-duplicate tasks
//!
//! Tasks are scanned once in input order. Each unassigned task seeds a
//! group; every other unassigned task joins if it is similar enough to any
//! member already in the group. A task admitted late in the scan is not
//! compared against tasks the scan has already passed, so grouping is
//! order-dependent when similarity is not transitive.

use serde::Serialize;
use tracing::{debug, warn};

use crate::task::Task;

/// A set of tasks that look like duplicates of each other
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Members in admission order, at least two
    pub tasks: Vec<Task>,
    /// Highest similarity that admitted a member
    pub max_similarity: f64,
    /// Pairwise scores between members, indexed like `tasks`
    pub similarity_matrix: Vec<Vec<f64>>,
}

/// Full symmetric N x N matrix with a unit diagonal
///
/// Each unordered pair is scored once. Scores are clamped into `[0, 1]`
/// and a NaN counts as 0.
pub fn build_similarity_matrix<S, F>(texts: &[S], mut similarity: F) -> Vec<Vec<f64>>
where
    S: AsRef<str>,
    F: FnMut(&str, &str) -> f64,
{
    let n = texts.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let score = clamp_score(similarity(texts[i].as_ref(), texts[j].as_ref()));
            matrix[i][j] = score;
            matrix[j][i] = score;
        }
    }

    matrix
}

/// Partition tasks into duplicate groups from a precomputed matrix
pub fn group_by_matrix(tasks: &[Task], matrix: &[Vec<f64>], threshold: f64) -> Vec<DuplicateGroup> {
    let n = tasks.len();
    if n <= 1 {
        return Vec::new();
    }
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        warn!("Similarity matrix does not match {} tasks, skipping grouping", n);
        return Vec::new();
    }

    let mut assigned = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let mut members = vec![i];
        let mut max_similarity: f64 = 0.0;

        for j in 0..n {
            if j == i || assigned[j] {
                continue;
            }

            let best = members
                .iter()
                .map(|&m| matrix[m][j])
                .fold(0.0_f64, f64::max);

            if best >= threshold {
                members.push(j);
                assigned[j] = true;
                max_similarity = max_similarity.max(best);
            }
        }

        if members.len() < 2 {
            continue;
        }

        let similarity_matrix = members
            .iter()
            .map(|&a| members.iter().map(|&b| matrix[a][b]).collect())
            .collect();

        groups.push(DuplicateGroup {
            tasks: members.iter().map(|&m| tasks[m].clone()).collect(),
            max_similarity,
            similarity_matrix,
        });
    }

    debug!("Grouped {} tasks into {} duplicate groups", n, groups.len());
    groups
}

/// Find duplicate groups by comparing task titles with `similarity`
pub fn find_duplicate_groups<F>(tasks: &[Task], similarity: F, threshold: f64) -> Vec<DuplicateGroup>
where
    F: FnMut(&str, &str) -> f64,
{
    if tasks.len() <= 1 {
        return Vec::new();
    }

    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    let matrix = build_similarity_matrix(&titles, similarity);
    group_by_matrix(tasks, &matrix, threshold)
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
