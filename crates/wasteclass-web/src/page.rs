use std::collections::HashMap;

use maud::{DOCTYPE, Markup, PreEscaped, html};
use wasteclass_core::FeatureSchema;

const STYLE: &str = "\
body { font-family: sans-serif; max-width: 36rem; margin: 2rem auto; }
form { display: grid; grid-template-columns: max-content 1fr; gap: 0.5rem 1rem; }
button { grid-column: 2; justify-self: start; }
.prediction { margin-top: 1.5rem; font-weight: bold; }";

/// The prediction form, optionally followed by the outcome of the last submission.
///
/// `values` refills inputs the user already typed.
pub fn render(
    schema: &FeatureSchema,
    prediction_text: Option<&str>,
    values: &HashMap<String, String>,
) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { "Food Waste Category Prediction" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                h1 { "Food Waste Category Prediction" }
                form action="/predict" method="post" {
                    @for field in &schema.fields {
                        label for=(field) { (FeatureSchema::caption(field)) }
                        input type="number" step="any" required
                            id=(field) name=(field) value=[values.get(field)];
                    }
                    button type="submit" { "Predict" }
                }
                @if let Some(text) = prediction_text {
                    p class="prediction" { (text) }
                }
            }
        }
    }
}
