use rust_embed::RustEmbed;

/// Stylesheet and script for the panel page, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/ui/static/"]
pub struct Assets;
