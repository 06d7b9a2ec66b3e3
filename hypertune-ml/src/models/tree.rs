//! CART decision trees with Gini impurity.

use crate::error::MlError;
use crate::models::{Classifier, check_fit_input, param_usize, type_error};
use crate::search::params::{ParamSet, ParamValue};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    All,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    pub fn from_param(value: &ParamValue) -> Result<Self, MlError> {
        match value {
            ParamValue::Str(s) => match s.as_str() {
                "sqrt" => Ok(Self::Sqrt),
                "log2" => Ok(Self::Log2),
                "all" | "none" => Ok(Self::All),
                _ => Err(type_error(
                    "max_features",
                    "\"sqrt\", \"log2\", \"all\" or a number",
                    value,
                )),
            },
            ParamValue::Int(n) if *n >= 1 => Ok(Self::Count(*n as usize)),
            ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(Self::Fraction(*f)),
            _ => Err(type_error("max_features", "\"sqrt\", \"log2\", \"all\" or a number", value)),
        }
    }

    /// Concrete feature count for `n_features` columns, at least 1.
    pub fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Log2 => (n_features as f64).log2() as usize,
            Self::All => n_features,
            Self::Count(n) => *n,
            Self::Fraction(f) => (f * n_features as f64) as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::All,
        }
    }
}

impl DecisionTreeConfig {
    pub fn from_params(
        params: &ParamSet,
        default_max_features: MaxFeatures,
    ) -> Result<Self, MlError> {
        let max_depth = match params.get("max_depth") {
            None => None,
            Some(ParamValue::Str(s)) if s == "none" => None,
            Some(v) => match v.as_i64() {
                Some(d) if d >= 1 => Some(d as usize),
                _ => return Err(type_error("max_depth", "a positive integer or \"none\"", v)),
            },
        };
        let min_samples_split = param_usize(params, "min_samples_split", 2)?;
        if min_samples_split < 2 {
            return Err(MlError::invalid_input(format!(
                "min_samples_split must be at least 2, got {min_samples_split}"
            )));
        }
        let max_features = match params.get("max_features") {
            None => default_max_features,
            Some(v) => MaxFeatures::from_param(v)?,
        };
        Ok(Self {
            max_depth,
            min_samples_split,
            max_features,
        })
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART tree. Rows go left when `x[feature] <= threshold`.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: DecisionTreeConfig,
    seed: u64,
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    k_features: usize,
    config: &'a DecisionTreeConfig,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    pub fn new(config: DecisionTreeConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            nodes: Vec::new(),
            n_features: 0,
            n_classes: 0,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Fit on the given row indices (repeats allowed, as in a bootstrap sample).
    pub(crate) fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        rows: Vec<usize>,
        n_classes: usize,
        rng: &mut StdRng,
    ) {
        let mut builder = Builder {
            x,
            y,
            n_classes,
            k_features: self.config.max_features.resolve(x.ncols()),
            config: &self.config,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(rows, 0);
        self.nodes = builder.nodes;
        self.n_features = x.ncols();
        self.n_classes = n_classes;
    }

    /// Class distribution of the leaf reached by one row.
    fn leaf_proba(&self, row: ndarray::ArrayView1<'_, f64>) -> &[f64] {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { proba } => return proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn accumulate_proba(&self, x: &Array2<f64>, out: &mut Array2<f64>) {
        for (i, row) in x.rows().into_iter().enumerate() {
            for (c, p) in self.leaf_proba(row).iter().enumerate() {
                out[[i, c]] += p;
            }
        }
    }

    pub(crate) fn check_predict_input(&self, x: &Array2<f64>) -> Result<(), MlError> {
        if self.nodes.is_empty() {
            return Err(MlError::model("decision tree used before fit"));
        }
        if x.ncols() != self.n_features {
            return Err(MlError::model(format!(
                "tree fitted on {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(())
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), MlError> {
        let n_classes = check_fit_input(x, y)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.fit_rows(x, y, (0..x.nrows()).collect(), n_classes, &mut rng);
        tracing::trace!(nodes = self.node_count(), depth = self.depth(), "fitted decision tree");
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>, MlError> {
        self.check_predict_input(x)?;
        let mut out = Array2::zeros((x.nrows(), self.n_classes));
        self.accumulate_proba(x, &mut out);
        Ok(out)
    }
}

impl Builder<'_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&rows);
        let parent_impurity = gini(&counts, rows.len());

        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || rows.len() < self.config.min_samples_split || parent_impurity == 0.0 {
            return self.leaf(&counts, rows.len());
        }

        let Some(best) = self.best_split(&rows) else {
            return self.leaf(&counts, rows.len());
        };
        if best.impurity >= parent_impurity - 1e-12 {
            return self.leaf(&counts, rows.len());
        }

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, best.feature]] <= best.threshold);

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { proba: Vec::new() });
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    fn leaf(&mut self, counts: &[usize], n: usize) -> usize {
        let total = n.max(1) as f64;
        self.nodes.push(Node::Leaf {
            proba: counts.iter().map(|&c| c as f64 / total).collect(),
        });
        self.nodes.len() - 1
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini over the sampled features; earlier features and
    /// lower thresholds win ties.
    fn best_split(&mut self, rows: &[usize]) -> Option<BestSplit> {
        let n_features = self.x.ncols();
        let features: Vec<usize> = if self.k_features >= n_features {
            (0..n_features).collect()
        } else {
            let mut picked =
                rand::seq::index::sample(&mut *self.rng, n_features, self.k_features).into_vec();
            picked.sort_unstable();
            picked
        };

        let n = rows.len();
        let mut best: Option<BestSplit> = None;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature in features {
            pairs.clear();
            pairs.extend(rows.iter().map(|&r| (self.x[[r, feature]], self.y[r])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = self.class_counts(rows);
            for pos in 0..n - 1 {
                let (value, class) = pairs[pos];
                left[class] += 1;
                right[class] -= 1;
                let next = pairs[pos + 1].0;
                if value == next {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;
                if best.as_ref().is_none_or(|b| impurity < b.impurity - 1e-12) {
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid < next { mid } else { value };
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let total = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_max_features_resolve() {
        assert_eq!(MaxFeatures::Sqrt.resolve(30), 5);
        assert_eq!(MaxFeatures::Log2.resolve(30), 4);
        assert_eq!(MaxFeatures::All.resolve(30), 30);
        assert_eq!(MaxFeatures::Count(50).resolve(30), 30);
        assert_eq!(MaxFeatures::Fraction(0.01).resolve(30), 1);
    }

    #[test]
    fn test_max_features_from_param() {
        assert_eq!(MaxFeatures::from_param(&"sqrt".into()).unwrap(), MaxFeatures::Sqrt);
        assert_eq!(MaxFeatures::from_param(&ParamValue::Int(3)).unwrap(), MaxFeatures::Count(3));
        assert!(MaxFeatures::from_param(&ParamValue::Float(1.5)).is_err());
        assert!(MaxFeatures::from_param(&"cube".into()).is_err());
    }

    #[test]
    fn test_learns_threshold() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut tree = DecisionTree::new(DecisionTreeConfig::default(), 0);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.predict(&array![[6.4], [6.6], [0.0]]).unwrap(), vec![0, 1, 0]);
    }

    #[test]
    fn test_zero_gain_split_is_not_taken() {
        // No single axis split lowers Gini on XOR, so the root stays a leaf.
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = vec![0, 1, 1, 0];
        let mut tree = DecisionTree::new(DecisionTreeConfig::default(), 0);
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.depth(), 0);
        let proba = tree.predict_proba(&x).unwrap();
        assert!((proba[[0, 0]] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let mut shallow = DecisionTree::new(
            DecisionTreeConfig {
                max_depth: Some(2),
                ..Default::default()
            },
            0,
        );
        shallow.fit(&x, &y).unwrap();
        assert!(shallow.depth() <= 2);

        let mut full = DecisionTree::new(DecisionTreeConfig::default(), 0);
        full.fit(&x, &y).unwrap();
        assert_eq!(full.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_from_params() {
        let mut params = ParamSet::new();
        params.insert("max_depth".into(), "none".into());
        params.insert("max_features".into(), "log2".into());
        let cfg = DecisionTreeConfig::from_params(&params, MaxFeatures::All).unwrap();
        assert_eq!(cfg.max_depth, None);
        assert_eq!(cfg.max_features, MaxFeatures::Log2);

        params.insert("max_depth".into(), ParamValue::Int(0));
        assert!(DecisionTreeConfig::from_params(&params, MaxFeatures::All).is_err());
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new(DecisionTreeConfig::default(), 0);
        assert!(tree.predict(&array![[1.0]]).is_err());
    }
}
