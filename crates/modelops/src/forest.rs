//! Bagged CART ensemble with Gini impurity.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::classifier::{check_rows, check_training_set, Classifier};
use crate::{ModelOpsError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Candidate features per split; `None` means `sqrt(n_features)`.
    pub max_features: Option<usize>,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
            random_state: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf { proba: Vec<f64> },
    Split { feature: usize, threshold: f64, left: usize, right: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf(&self, row: &[f64]) -> &[f64] {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { proba } => return proba,
                Node::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Borrowed training view shared by every tree build.
struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize], // class index
    n_classes: usize,
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl Builder<'_> {
    fn counts(&self, idx: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in idx {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn build(&self, idx: Vec<usize>, depth: usize, rng: &mut StdRng, nodes: &mut Vec<Node>) -> usize {
        let counts = self.counts(&idx);
        let parent = gini(&counts, idx.len());
        let at = nodes.len();
        nodes.push(Node::Leaf {
            proba: counts.iter().map(|&c| c as f64 / idx.len() as f64).collect(),
        });

        if depth >= self.max_depth || idx.len() < self.min_samples_split || parent == 0.0 {
            return at;
        }
        let Some(best) = self.best_split(&idx, rng) else { return at };
        if best.impurity >= parent {
            return at;
        }

        let (l, r): (Vec<usize>, Vec<usize>) =
            idx.into_iter().partition(|&i| self.x[i][best.feature] <= best.threshold);
        let left = self.build(l, depth + 1, rng, nodes);
        let right = self.build(r, depth + 1, rng, nodes);
        nodes[at] = Node::Split { feature: best.feature, threshold: best.threshold, left, right };
        at
    }

    fn best_split(&self, idx: &[usize], rng: &mut StdRng) -> Option<BestSplit> {
        let n_features = self.x[idx[0]].len();
        let candidates = rand::seq::index::sample(rng, n_features, self.max_features.min(n_features));
        let total = idx.len();
        let mut best: Option<BestSplit> = None;

        for feature in candidates.iter() {
            let mut order = idx.to_vec();
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left = vec![0usize; self.n_classes];
            let mut right = self.counts(&order);

            for k in 0..total - 1 {
                let c = self.y[order[k]];
                left[c] += 1;
                right[c] -= 1;

                let v = self.x[order[k]][feature];
                let next = self.x[order[k + 1]][feature];
                if v == next {
                    continue;
                }

                let nl = k + 1;
                let nr = total - nl;
                let impurity = (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / total as f64;
                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = v + (next - v) / 2.0;
                    if threshold >= next {
                        threshold = v;
                    }
                    best = Some(BestSplit { feature, threshold, impurity });
                }
            }
        }
        best
    }
}

/// Random forest classifier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    classes: Vec<u32>,
    n_features: Option<usize>,
    trees: Vec<Tree>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self { params, ..Default::default() }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u32]) -> Result<()> {
        let n_features = check_training_set(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(ModelOpsError::InvalidInput("n_estimators must be positive".into()));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let y_idx: Vec<usize> = y
            .iter()
            .map(|c| classes.binary_search(c).unwrap_or_default())
            .collect();

        let max_features = self
            .params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .max(1);

        let builder = Builder {
            x,
            y: &y_idx,
            n_classes: classes.len(),
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split.max(2),
            max_features,
        };

        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let n = x.len();
        let trees = (0..self.params.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let bootstrap: Vec<usize> = (0..n).map(|_| tree_rng.gen_range(0..n)).collect();
                let mut nodes = Vec::new();
                builder.build(bootstrap, 0, &mut tree_rng, &mut nodes);
                Tree { nodes }
            })
            .collect();

        self.classes = classes;
        self.n_features = Some(n_features);
        self.trees = trees;
        Ok(())
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n_features = self.n_features.filter(|_| self.is_fitted()).ok_or(ModelOpsError::NotTrained)?;
        check_rows(x, n_features)?;

        let n_trees = self.trees.len() as f64;
        Ok(x
            .iter()
            .map(|row| {
                let mut acc = vec![0.0; self.classes.len()];
                for tree in &self.trees {
                    for (a, p) in acc.iter_mut().zip(tree.leaf(row)) {
                        *a += p;
                    }
                }
                acc.iter().map(|a| a / n_trees).collect()
            })
            .collect())
    }

    fn classes(&self) -> &[u32] {
        &self.classes
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}
