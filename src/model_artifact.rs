//! XGBoost model artifact loader.
//!
//! Reads the JSON document written by `Booster.save_model("*.json")` (or
//! `XGBClassifier.save_model`) and turns it into a validated, immutable tree
//! ensemble. Only binary-classification gbtree models are accepted.

use crate::errors::{PiRiskError, PiRiskResult};
use crate::feature_schema::FeatureSpec;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

// ---------------------------------------------------------------------------
// On-disk layout
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbGradientBooster,
    learner_model_param: XgbLearnerModelParam,
    objective: XgbObjective,
}

#[derive(Debug, Deserialize)]
struct XgbGradientBooster {
    name: String,
    model: Option<XgbGbtreeModel>,
}

#[derive(Debug, Deserialize)]
struct XgbGbtreeModel {
    trees: Vec<XgbTree>,
    #[serde(default)]
    tree_info: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct XgbLearnerModelParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    default_left: Vec<XgbFlag>,
    sum_hessian: Vec<f64>,
}

/// `default_left` is written as 0/1 by some XGBoost versions and as booleans
/// by others.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum XgbFlag {
    Bool(bool),
    Int(i64),
}

impl XgbFlag {
    fn is_set(self) -> bool {
        match self {
            XgbFlag::Bool(b) => b,
            XgbFlag::Int(i) => i != 0,
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory model
// ---------------------------------------------------------------------------

/// Learning objective; decides how the stored base score maps to a margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Base score stored as a probability
    BinaryLogistic,
    /// Base score stored as a raw margin
    BinaryLogitRaw,
}

impl Objective {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "binary:logistic" => Some(Objective::BinaryLogistic),
            "binary:logitraw" => Some(Objective::BinaryLogitRaw),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::BinaryLogistic => "binary:logistic",
            Objective::BinaryLogitRaw => "binary:logitraw",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// `(left, right)` for a split, `None` for a leaf
    pub children: Option<(usize, usize)>,
    pub split_feature: usize,
    /// Rows with `value as f32 < threshold` go left
    pub threshold: f32,
    pub default_left: bool,
    /// Leaf output; unused for splits
    pub leaf_value: f64,
    /// Training hessian sum that reached this node
    pub cover: f64,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// A single regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn new(nodes: Vec<TreeNode>) -> PiRiskResult<Self> {
        if nodes.is_empty() {
            return Err(PiRiskError::internal("tree has no nodes"));
        }
        for (i, node) in nodes.iter().enumerate() {
            if let Some((l, r)) = node.children {
                // Children always follow their parent, which also rules out cycles.
                if l <= i || r <= i || l >= nodes.len() || r >= nodes.len() || l == r {
                    return Err(PiRiskError::internal(format!(
                        "node {i} has invalid children ({l}, {r})"
                    )));
                }
            }
            if !(node.cover >= 0.0) {
                return Err(PiRiskError::internal(format!("node {i} has negative cover")));
            }
        }
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    /// Child a row follows out of split `index`.
    pub fn next_node(&self, index: usize, values: &[f64]) -> usize {
        let node = &self.nodes[index];
        let (left, right) = match node.children {
            Some(children) => children,
            None => return index,
        };
        let x = values[node.split_feature];
        if x.is_nan() {
            if node.default_left {
                left
            } else {
                right
            }
        } else if (x as f32) < node.threshold {
            left
        } else {
            right
        }
    }

    pub fn leaf_for(&self, values: &[f64]) -> usize {
        let mut index = 0;
        while !self.nodes[index].is_leaf() {
            index = self.next_node(index, values);
        }
        index
    }

    pub fn predict(&self, values: &[f64]) -> f64 {
        self.nodes[self.leaf_for(values)].leaf_value
    }

    /// Share of a split's training cover that went to `child`. Normalised by
    /// the children's own covers so the fractions always sum to one.
    pub fn cover_fraction(&self, index: usize, child: usize) -> f64 {
        match self.nodes[index].children {
            Some((l, r)) => {
                let total = self.nodes[l].cover + self.nodes[r].cover;
                if total > 0.0 {
                    self.nodes[child].cover / total
                } else {
                    0.5
                }
            }
            None => 1.0,
        }
    }

    /// Cover-weighted mean leaf value: the tree's output when nothing is known
    /// about the row.
    pub fn expected_value(&self) -> f64 {
        self.expected_from(0)
    }

    fn expected_from(&self, index: usize) -> f64 {
        match self.nodes[index].children {
            None => self.nodes[index].leaf_value,
            Some((l, r)) => {
                self.cover_fraction(index, l) * self.expected_from(l)
                    + self.cover_fraction(index, r) * self.expected_from(r)
            }
        }
    }
}

/// Loaded classifier artifact. Read-only after construction.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    source: String,
    fingerprint: String,
    feature_names: Vec<String>,
    num_features: usize,
    objective: Objective,
    base_margin: f64,
    trees: Vec<Tree>,
}

impl ModelArtifact {
    /// Load an artifact from disk. Any failure is reported as `ModelLoad`
    /// carrying the path.
    pub fn load<P: AsRef<Path>>(path: P) -> PiRiskResult<Self> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let bytes = std::fs::read(path)
            .map_err(|e| PiRiskError::model_load(&source, e.to_string()))?;
        tracing::debug!(path = %source, bytes = bytes.len(), "read model artifact");
        Self::from_slice(&bytes, &source)
    }

    pub fn from_json_str(json: &str, source: &str) -> PiRiskResult<Self> {
        Self::from_slice(json.as_bytes(), source)
    }

    fn from_slice(bytes: &[u8], source: &str) -> PiRiskResult<Self> {
        let fail = |reason: String| PiRiskError::model_load(source, reason);

        let doc: XgbDocument =
            serde_json::from_slice(bytes).map_err(|e| fail(format!("invalid JSON: {e}")))?;
        let learner = doc.learner;

        let objective = Objective::parse(&learner.objective.name).ok_or_else(|| {
            fail(format!(
                "unsupported objective {}",
                learner.objective.name
            ))
        })?;

        if learner.gradient_booster.name != "gbtree" {
            return Err(fail(format!(
                "unsupported booster {}",
                learner.gradient_booster.name
            )));
        }

        let params = &learner.learner_model_param;
        if let Some(num_class) = params.num_class.as_deref() {
            let classes: u32 = num_class
                .trim()
                .parse()
                .map_err(|_| fail(format!("bad num_class {num_class}")))?;
            if classes > 1 {
                return Err(fail(format!("{classes}-class models are not supported")));
            }
        }

        let num_features: usize = params
            .num_feature
            .trim()
            .parse()
            .map_err(|_| fail(format!("bad num_feature {}", params.num_feature)))?;

        let base_score = parse_base_score(&params.base_score)
            .ok_or_else(|| fail(format!("bad base_score {}", params.base_score)))?;
        let base_margin = match objective {
            Objective::BinaryLogistic => {
                if !(base_score > 0.0 && base_score < 1.0) {
                    return Err(fail(format!(
                        "base_score {base_score} is not a probability"
                    )));
                }
                (base_score / (1.0 - base_score)).ln()
            }
            Objective::BinaryLogitRaw => base_score,
        };

        if !learner.feature_names.is_empty() && learner.feature_names.len() != num_features {
            return Err(fail(format!(
                "{} feature names for {num_features} features",
                learner.feature_names.len()
            )));
        }

        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| fail("missing gradient_booster.model".to_string()))?;

        if model.tree_info.iter().any(|group| *group != 0) {
            return Err(fail("trees belong to more than one output group".to_string()));
        }

        let trees = model
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| convert_tree(t, num_features).map_err(|e| fail(format!("tree {i}: {e}"))))
            .collect::<PiRiskResult<Vec<_>>>()?;

        if trees.is_empty() {
            return Err(fail("model has no trees".to_string()));
        }

        let fingerprint = hex::encode(Sha256::digest(bytes));

        tracing::info!(
            path = %source,
            objective = objective.name(),
            trees = trees.len(),
            num_features,
            fingerprint = %&fingerprint[..12],
            "model artifact loaded"
        );

        Ok(Self {
            source: source.to_string(),
            fingerprint,
            feature_names: learner.feature_names,
            num_features,
            objective,
            base_margin,
            trees,
        })
    }

    /// The schema this artifact expects. Taken from the artifact's own feature
    /// names when present, otherwise the canonical layout, whose width must
    /// then match.
    pub fn feature_spec(&self) -> PiRiskResult<FeatureSpec> {
        let spec = if self.feature_names.is_empty() {
            FeatureSpec::canonical()
        } else {
            FeatureSpec::from_names(&self.feature_names)?
        };

        if spec.len() != self.num_features {
            return Err(PiRiskError::model_load(
                &self.source,
                format!(
                    "artifact expects {} features, schema has {}",
                    self.num_features,
                    spec.len()
                ),
            ));
        }

        Ok(spec)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// SHA-256 of the artifact bytes, hex encoded
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn has_feature_names(&self) -> bool {
        !self.feature_names.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn base_margin(&self) -> f64 {
        self.base_margin
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Raw log-odds score for a model-ordered row.
    pub fn margin(&self, values: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict(values)).sum::<f64>()
    }
}

fn parse_base_score(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn convert_tree(tree: &XgbTree, num_features: usize) -> Result<Tree, String> {
    let n = tree.left_children.len();
    let lengths = [
        tree.right_children.len(),
        tree.split_indices.len(),
        tree.split_conditions.len(),
        tree.default_left.len(),
        tree.sum_hessian.len(),
    ];
    if n == 0 || lengths.iter().any(|len| *len != n) {
        return Err(format!("node arrays have inconsistent lengths ({n} vs {lengths:?})"));
    }

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let (l, r) = (tree.left_children[i], tree.right_children[i]);
        let children = match (l, r) {
            (-1, -1) => None,
            (l, r) if l >= 0 && r >= 0 => Some((l as usize, r as usize)),
            _ => return Err(format!("node {i} has only one child")),
        };

        let split_feature = tree.split_indices[i];
        if children.is_some() && (split_feature < 0 || split_feature as usize >= num_features) {
            return Err(format!("node {i} splits on feature {split_feature}"));
        }

        nodes.push(TreeNode {
            children,
            split_feature: split_feature.max(0) as usize,
            // XGBoost writes split values as f32 text and compares in f32.
            threshold: tree.split_conditions[i] as f32,
            default_left: tree.default_left[i].is_set(),
            // XGBoost stores the leaf output in split_conditions for leaves.
            leaf_value: if children.is_none() {
                tree.split_conditions[i]
            } else {
                0.0
            },
            cover: tree.sum_hessian[i],
        });
    }

    Tree::new(nodes).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(trees: &str, names: &str, base_score: &str) -> String {
        format!(
            r#"{{"learner": {{
                "feature_names": {names},
                "gradient_booster": {{"name": "gbtree", "model": {{"trees": [{trees}], "tree_info": [0]}}}},
                "learner_model_param": {{"base_score": "{base_score}", "num_class": "0", "num_feature": "2"}},
                "objective": {{"name": "binary:logistic"}}
            }}}}"#
        )
    }

    const STUMP: &str = r#"{
        "left_children": [1, -1, -1],
        "right_children": [2, -1, -1],
        "split_indices": [1, 0, 0],
        "split_conditions": [10.0, -0.4, 0.6],
        "default_left": [1, 0, 0],
        "base_weights": [0.0, -0.4, 0.6],
        "sum_hessian": [4.0, 3.0, 1.0]
    }"#;

    #[test]
    fn loads_stump_and_scores_rows() {
        let json = doc(STUMP, r#"["Glucose", "Days_in_ICU"]"#, "5E-1");
        let model = ModelArtifact::from_json_str(&json, "inline").unwrap();

        assert_eq!(model.trees().len(), 1);
        assert!(model.base_margin().abs() < 1e-12);
        assert_eq!(model.margin(&[0.0, 3.0]), -0.4);
        assert_eq!(model.margin(&[0.0, 10.0]), 0.6);
        assert_eq!(model.margin(&[0.0, f64::NAN]), -0.4);
        assert_eq!(model.feature_spec().unwrap().names(), vec!["Glucose", "Days_in_ICU"]);
    }

    #[test]
    fn bracketed_base_score_is_accepted() {
        let json = doc(STUMP, r#"["Glucose", "Days_in_ICU"]"#, "[2.5E-1]");
        let model = ModelArtifact::from_json_str(&json, "inline").unwrap();
        assert!((model.base_margin() - (0.25f64 / 0.75).ln()).abs() < 1e-12);
    }

    #[test]
    fn expected_value_is_cover_weighted() {
        let json = doc(STUMP, "[]", "5E-1");
        let model = ModelArtifact::from_json_str(&json, "inline").unwrap();
        let expected = 0.75 * -0.4 + 0.25 * 0.6;
        assert!((model.trees()[0].expected_value() - expected).abs() < 1e-12);
    }

    #[test]
    fn nameless_artifact_must_match_canonical_width() {
        let json = doc(STUMP, "[]", "5E-1");
        let model = ModelArtifact::from_json_str(&json, "inline").unwrap();
        let err = model.feature_spec().unwrap_err();
        assert!(matches!(err, PiRiskError::ModelLoad { .. }));
    }

    #[test]
    fn corrupt_artifacts_are_model_load_errors() {
        let bad_json = ModelArtifact::from_json_str("{not json", "inline").unwrap_err();
        assert!(matches!(bad_json, PiRiskError::ModelLoad { .. }));

        let ragged = STUMP.replace("\"sum_hessian\": [4.0, 3.0, 1.0]", "\"sum_hessian\": [4.0]");
        let err = ModelArtifact::from_json_str(&doc(&ragged, "[]", "5E-1"), "inline").unwrap_err();
        assert!(err.to_string().contains("inconsistent lengths"));

        let out_of_range = STUMP.replace("\"split_indices\": [1, 0, 0]", "\"split_indices\": [7, 0, 0]");
        let err =
            ModelArtifact::from_json_str(&doc(&out_of_range, "[]", "5E-1"), "inline").unwrap_err();
        assert!(err.to_string().contains("splits on feature 7"));

        let bad_base = ModelArtifact::from_json_str(&doc(STUMP, "[]", "1.5"), "inline").unwrap_err();
        assert!(bad_base.to_string().contains("not a probability"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ModelArtifact::load("/nonexistent/xgb_model.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/xgb_model.json"));
    }

    #[test]
    fn splits_compare_in_single_precision() {
        // 4.6 is stored as the nearest f32, 4.599999904...; an input that
        // rounds onto it in f32 is not below the split.
        let tree = STUMP.replace("[10.0, -0.4, 0.6]", "[4.6, -1.0, 1.0]");
        let model = ModelArtifact::from_json_str(&doc(&tree, "[]", "5E-1"), "inline").unwrap();

        assert_eq!(model.margin(&[0.0, 4.59999995]), 1.0);
        assert_eq!(model.margin(&[0.0, 4.5999]), -1.0);
        assert_eq!(model.trees()[0].leaf_for(&[0.0, 4.59999995]), 2);
    }

    #[test]
    fn logitraw_base_score_is_already_a_margin() {
        let json = doc(STUMP, "[]", "-2E-1").replace("binary:logistic", "binary:logitraw");
        let model = ModelArtifact::from_json_str(&json, "inline").unwrap();

        assert_eq!(model.objective(), Objective::BinaryLogitRaw);
        assert!((model.base_margin() - (-0.2)).abs() < 1e-12);
        assert!((model.margin(&[0.0, 3.0]) - (-0.6)).abs() < 1e-12);
    }

    #[test]
    fn unsupported_objective_is_rejected() {
        let json = doc(STUMP, "[]", "5E-1").replace("binary:logistic", "multi:softprob");
        let err = ModelArtifact::from_json_str(&json, "inline").unwrap_err();
        assert!(matches!(err, PiRiskError::ModelLoad { .. }));
        assert!(err.to_string().contains("unsupported objective multi:softprob"));
    }

    #[test]
    fn multi_class_model_is_rejected() {
        let json = doc(STUMP, "[]", "5E-1").replace(r#""num_class": "0""#, r#""num_class": "3""#);
        let err = ModelArtifact::from_json_str(&json, "inline").unwrap_err();
        assert!(matches!(err, PiRiskError::ModelLoad { .. }));
        assert!(err.to_string().contains("3-class models are not supported"));
    }

    #[test]
    fn non_tree_booster_is_rejected() {
        let json = doc(STUMP, "[]", "5E-1").replace(r#""name": "gbtree""#, r#""name": "gblinear""#);
        let err = ModelArtifact::from_json_str(&json, "inline").unwrap_err();
        assert!(matches!(err, PiRiskError::ModelLoad { .. }));
        assert!(err.to_string().contains("unsupported booster gblinear"));
    }

    #[test]
    fn boolean_default_left_is_accepted() {
        let tree = STUMP.replace("\"default_left\": [1, 0, 0]", "\"default_left\": [false, false, false]");
        let model = ModelArtifact::from_json_str(&doc(&tree, "[]", "5E-1"), "inline").unwrap();
        assert_eq!(model.margin(&[0.0, f64::NAN]), 0.6);
    }
}
