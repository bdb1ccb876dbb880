//! `parley render` — Classify and render text.

use parley_agent::ResponseRenderer;

pub async fn run(text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let renderer = ResponseRenderer::new();
    let (rendered, content_type) = renderer.render_auto(text)?;
    eprintln!("  [{content_type}]");
    println!("{rendered}");
    Ok(())
}
