//! `eksdeploy version`

use anyhow::Result;

use crate::app::AppContext;

pub fn run(app: &AppContext) -> Result<i32> {
    if app.is_json() {
        let obj = serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
    } else {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    }
    Ok(0)
}
