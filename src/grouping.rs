use crate::matrix::SimMatrix;
use itertools::Itertools;

/// Two or more activities believed to denote the same real-world activity.
/// The score is the mean of the qualifying edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityGroup {
    pub members: Vec<usize>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPair {
    pub a: usize,
    pub b: usize,
    pub score: f64,
}

// i ~ j iff both the overall and the string scores clear their thresholds
fn adjacency(
    overall: &SimMatrix,
    string_sim: &SimMatrix,
    overall_threshold: f64,
    string_threshold: f64,
) -> Vec<Vec<usize>> {
    let n = overall.len();
    let mut adj = vec![Vec::new(); n];
    for (i, j) in overall.pairs() {
        if overall.get(i, j) > overall_threshold && string_sim.get(i, j) > string_threshold {
            adj[i].push(j);
            adj[j].push(i);
        }
    }
    adj
}

/// Connected components over the thresholded graph. Members of a component
/// need not all be pairwise similar: chains merge transitively. Singletons
/// are dropped, and components larger than `max_group_size` are truncated
/// to their strongest-edge members.
pub fn group_components(
    overall: &SimMatrix,
    string_sim: &SimMatrix,
    overall_threshold: f64,
    string_threshold: f64,
    max_group_size: usize,
) -> Vec<ActivityGroup> {
    let n = overall.len();
    let adj = adjacency(overall, string_sim, overall_threshold, string_threshold);
    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for start in 0..n {
        if visited[start] || adj[start].is_empty() {
            continue;
        }
        // iterative depth-first traversal
        let mut members = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(v) = stack.pop() {
            members.push(v);
            for &w in adj[v].iter() {
                if !visited[w] {
                    visited[w] = true;
                    stack.push(w);
                }
            }
        }
        if members.len() < 2 {
            continue;
        }
        members.sort_unstable();

        if members.len() > max_group_size && max_group_size >= 2 {
            let strongest = |&v: &usize| -> f64 {
                adj[v]
                    .iter()
                    .map(|&w| overall.get(v, w))
                    .fold(f64::NEG_INFINITY, f64::max)
            };
            let mut ranked = members.clone();
            ranked.sort_by(|a, b| {
                strongest(b).partial_cmp(&strongest(a)).unwrap_or(std::cmp::Ordering::Equal)
            });
            let mut kept: Vec<usize> = ranked.into_iter().take(max_group_size).collect();
            kept.sort_unstable();
            let score = component_score(overall, &adj, &kept)
                .unwrap_or_else(|| component_score(overall, &adj, &members).unwrap_or(0.0));
            groups.push(ActivityGroup { members: kept, score });
        } else {
            let score = component_score(overall, &adj, &members).unwrap_or(0.0);
            groups.push(ActivityGroup { members, score });
        }
    }
    groups
}

fn component_score(overall: &SimMatrix, adj: &[Vec<usize>], members: &[usize]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (idx, &v) in members.iter().enumerate() {
        for &w in members[idx + 1..].iter() {
            if adj[v].contains(&w) {
                sum += overall.get(v, w);
                count += 1;
            }
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Greedy pair selection: qualifying pairs sorted by descending overall
/// score, each added as an undirected edge unless it would close a cycle,
/// stopping at `max_pairs`. The output is always a forest.
pub fn select_pairs(
    overall: &SimMatrix,
    string_sim: &SimMatrix,
    overall_threshold: f64,
    string_threshold: f64,
    max_pairs: usize,
) -> Vec<ActivityPair> {
    let candidates = overall
        .pairs()
        .filter(|&(i, j)| {
            overall.get(i, j) > overall_threshold && string_sim.get(i, j) > string_threshold
        })
        .sorted_by(|&(a1, b1), &(a2, b2)| {
            overall
                .get(a2, b2)
                .partial_cmp(&overall.get(a1, b1))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (a1, b1).cmp(&(a2, b2)))
        });

    let mut edges: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();
    for (i, j) in candidates {
        if out.len() >= max_pairs {
            break;
        }
        edges.push((i, j));
        if has_cycle(overall.len(), &edges) {
            edges.pop();
            continue;
        }
        out.push(ActivityPair { a: i, b: j, score: overall.get(i, j) });
    }
    out
}

/// Generic undirected-cycle check over an edge list.
pub fn has_cycle(n: usize, edges: &[(usize, usize)]) -> bool {
    let mut adj = vec![Vec::new(); n];
    for &(a, b) in edges.iter() {
        adj[a].push(b);
        adj[b].push(a);
    }
    let mut visited = vec![false; n];
    for start in 0..n {
        if visited[start] {
            continue;
        }
        // DFS with parent edges; a visited non-parent neighbor closes a cycle
        let mut stack: Vec<(usize, Option<usize>)> = vec![(start, None)];
        visited[start] = true;
        while let Some((v, parent)) = stack.pop() {
            let mut parent_seen = false;
            for &w in adj[v].iter() {
                if Some(w) == parent && !parent_seen {
                    parent_seen = true;
                    continue;
                }
                if visited[w] {
                    return true;
                }
                visited[w] = true;
                stack.push((w, Some(v)));
            }
        }
    }
    false
}
