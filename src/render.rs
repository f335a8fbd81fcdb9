//! HTML rendering for the single-page form and its result panel.
//!
//! Pure string building; nothing here touches the model.

use crate::explanation::AttributionResult;
use crate::feature_schema::{Feature, FeatureKind, FeatureSpec};
use crate::pipeline::Assessment;
use std::collections::BTreeMap;
use std::fmt::Write as _;

const TITLE: &str = "Predictive XGBoost Machine Learning App for Pressure Injury in ICU";
const SUBTITLE: &str =
    "This app allows you to input clinical data and predicts outcomes using an XGBoost model.";
const FOOTER: &str = "Developed by [Jie Xu]. Powered by Rust and XGBoost.";

const STYLE: &str = r#"
body { background-color: #f5f5f5; color: #333333; font-family: sans-serif; margin: 2rem; }
h1, h2, h3 { color: #3a7bd5; }
.columns { display: flex; gap: 2rem; }
.column { flex: 1; display: flex; flex-direction: column; gap: 0.75rem; }
label { display: flex; flex-direction: column; font-size: 0.9rem; }
input, select { padding: 0.4rem; border-radius: 5px; border: 1px solid #cccccc; }
button { background-color: #4CAF50; color: white; border: none; border-radius: 5px; padding: 0.6rem 1.4rem; margin-top: 1rem; }
.success { background: #e6f4ea; border-left: 4px solid #4CAF50; padding: 0.75rem; }
.info { background: #e8f0fe; border-left: 4px solid #3a7bd5; padding: 0.75rem; }
.error { background: #fdecea; border-left: 4px solid #d93025; padding: 0.75rem; }
"#;

/// What to show under the form.
pub enum Outcome<'a> {
    None,
    Scored(&'a Assessment),
    InputError(String),
    Failure,
}

pub fn prediction_text(positive: bool) -> &'static str {
    if positive {
        "Prediction: Pressure Injury will occur"
    } else {
        "Prediction: Pressure Injury will not occur"
    }
}

/// Probability as a percentage rounded to two decimals, e.g. `37.12%`.
pub fn format_probability(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

/// Layout column (0..3) a field is placed in.
fn form_column(feature: Feature) -> usize {
    match feature {
        Feature::DaysInIcu | Feature::DepartmentTransfer | Feature::Consciousness => 0,
        Feature::Glucose | Feature::NeutrophilCount | Feature::SerumAlbumin => 1,
        Feature::Sedatives
        | Feature::WarmingBlanket
        | Feature::MechanicalVentilation
        | Feature::SmokingHistory => 2,
    }
}

/// Display order inside a column; follows the form, not the model.
fn form_rank(feature: Feature) -> usize {
    match feature {
        Feature::DaysInIcu => 0,
        Feature::DepartmentTransfer => 1,
        Feature::Consciousness => 2,
        Feature::Glucose => 3,
        Feature::NeutrophilCount => 4,
        Feature::SerumAlbumin => 5,
        Feature::Sedatives => 6,
        Feature::WarmingBlanket => 7,
        Feature::MechanicalVentilation => 8,
        Feature::SmokingHistory => 9,
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_field(html: &mut String, feature: Feature, current: &str) {
    let name = feature.column_name();
    let _ = write!(html, "<label>{}", escape_html(feature.label()));
    match feature.kind() {
        FeatureKind::BooleanCategorical => {
            let _ = write!(html, "<select name=\"{name}\">");
            for option in ["Yes", "No"] {
                let selected = if current == option { " selected" } else { "" };
                let _ = write!(html, "<option value=\"{option}\"{selected}>{option}</option>");
            }
            html.push_str("</select>");
        }
        FeatureKind::ContinuousNumeric { integral } => {
            let step = if integral { "1" } else { "any" };
            let _ = write!(
                html,
                "<input type=\"number\" name=\"{name}\" min=\"0\" step=\"{step}\" value=\"{}\">",
                escape_html(current)
            );
        }
    }
    html.push_str("</label>");
}

/// Full page: form prefilled with `values`, followed by the outcome panel.
pub fn render_page(
    spec: &FeatureSpec,
    values: &BTreeMap<Feature, String>,
    outcome: Outcome<'_>,
) -> String {
    let mut html = String::with_capacity(8 * 1024);
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Predictive Model App</title><style>{STYLE}</style></head><body>"
    );
    let _ = write!(html, "<h1>{TITLE}</h1><h3>{SUBTITLE}</h3><hr>");

    html.push_str("<form method=\"post\" action=\"/\"><div class=\"columns\">");
    for column in 0..3 {
        html.push_str("<div class=\"column\">");
        let mut fields: Vec<Feature> = spec.iter().filter(|f| form_column(*f) == column).collect();
        fields.sort_by_key(|f| form_rank(*f));
        for feature in fields {
            let current = values.get(&feature).map(String::as_str).unwrap_or("");
            render_field(&mut html, feature, current);
        }
        html.push_str("</div>");
    }
    html.push_str("</div><button type=\"submit\">Predict</button></form>");

    match outcome {
        Outcome::None => {}
        Outcome::Scored(assessment) => {
            let p = &assessment.prediction;
            let _ = write!(
                html,
                "<div class=\"success\">{}</div><div class=\"info\">Predicted probability: <b>{}</b></div>",
                prediction_text(p.is_positive()),
                format_probability(p.probability)
            );
            html.push_str(&force_plot_svg(&assessment.attribution));
        }
        Outcome::InputError(message) => {
            let _ = write!(
                html,
                "<div class=\"error\">Invalid input: {}</div>",
                escape_html(&message)
            );
        }
        Outcome::Failure => {
            html.push_str(
                "<div class=\"error\">Prediction failed. Please try again or contact the administrator.</div>",
            );
        }
    }

    let _ = write!(html, "<hr><p>{FOOTER}</p></body></html>");
    html
}

const PLOT_WIDTH: f64 = 1500.0;
const PLOT_HEIGHT: f64 = 140.0;
const PLOT_MARGIN: f64 = 40.0;
const POSITIVE_COLOUR: &str = "#ff0d57";
const NEGATIVE_COLOUR: &str = "#1e88e5";

/// Additive force plot: features pushing the score up stack in red to the
/// left of the output value, features pushing it down stack in blue to the
/// right, with the base value marked on the same axis (log-odds).
pub fn force_plot_svg(attribution: &AttributionResult) -> String {
    let output = attribution.output_value();
    let ranked = attribution.ranked();
    let positive: Vec<_> = ranked.iter().filter(|c| c.shap > 0.0).collect();
    let negative: Vec<_> = ranked.iter().filter(|c| c.shap < 0.0).collect();

    let push_up: f64 = positive.iter().map(|c| c.shap).sum();
    let push_down: f64 = negative.iter().map(|c| -c.shap).sum();

    let lo = (output - push_up).min(attribution.base_value);
    let hi = (output + push_down).max(attribution.base_value);
    let span = if hi - lo > f64::EPSILON { hi - lo } else { 1.0 };
    let x = |v: f64| PLOT_MARGIN + (v - lo) / span * (PLOT_WIDTH - 2.0 * PLOT_MARGIN);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"force-plot\" width=\"{PLOT_WIDTH}\" height=\"{PLOT_HEIGHT}\" viewBox=\"0 0 {PLOT_WIDTH} {PLOT_HEIGHT}\">"
    );
    let _ = write!(
        svg,
        "<line x1=\"{m}\" y1=\"60\" x2=\"{e}\" y2=\"60\" stroke=\"#bbbbbb\"/>",
        m = PLOT_MARGIN,
        e = PLOT_WIDTH - PLOT_MARGIN
    );

    let segment = |svg: &mut String, from: f64, to: f64, colour: &str, label: String| {
        let (x0, x1) = (x(from.min(to)), x(from.max(to)));
        let _ = write!(
            svg,
            "<rect x=\"{x0:.1}\" y=\"45\" width=\"{w:.1}\" height=\"30\" fill=\"{colour}\" stroke=\"white\"><title>{label}</title></rect>",
            w = (x1 - x0).max(0.5),
            label = escape_html(&label)
        );
        if x1 - x0 > 60.0 {
            let _ = write!(
                svg,
                "<text x=\"{cx:.1}\" y=\"95\" font-size=\"11\" text-anchor=\"middle\" fill=\"{colour}\">{label}</text>",
                cx = (x0 + x1) / 2.0,
                label = escape_html(&label)
            );
        }
    };

    let mut cursor = output;
    for c in &positive {
        segment(
            &mut svg,
            cursor - c.shap,
            cursor,
            POSITIVE_COLOUR,
            format!("{} = {}", c.feature, c.value),
        );
        cursor -= c.shap;
    }
    let mut cursor = output;
    for c in &negative {
        segment(
            &mut svg,
            cursor,
            cursor - c.shap,
            NEGATIVE_COLOUR,
            format!("{} = {}", c.feature, c.value),
        );
        cursor -= c.shap;
    }

    let _ = write!(
        svg,
        "<line x1=\"{bx:.1}\" y1=\"30\" x2=\"{bx:.1}\" y2=\"80\" stroke=\"#888888\" stroke-dasharray=\"3,3\"/>\
         <text x=\"{bx:.1}\" y=\"22\" font-size=\"12\" text-anchor=\"middle\" fill=\"#888888\">base value {base:.2}</text>",
        bx = x(attribution.base_value),
        base = attribution.base_value
    );
    let _ = write!(
        svg,
        "<text x=\"{fx:.1}\" y=\"40\" font-size=\"14\" font-weight=\"bold\" text-anchor=\"middle\">f(x) = {output:.2}</text>",
        fx = x(output)
    );
    let _ = write!(
        svg,
        "<text x=\"{PLOT_MARGIN}\" y=\"125\" font-size=\"11\" fill=\"{POSITIVE_COLOUR}\">higher</text>\
         <text x=\"{r}\" y=\"125\" font-size=\"11\" text-anchor=\"end\" fill=\"{NEGATIVE_COLOUR}\">lower</text>",
        r = PLOT_WIDTH - PLOT_MARGIN
    );
    svg.push_str("</svg>");
    svg
}
