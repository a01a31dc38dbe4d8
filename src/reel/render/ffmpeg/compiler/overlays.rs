use crate::reel::render::plan::{
    Anchor, BOTTOM_MARGIN, LOGO_LEFT_MARGIN, LogoOverlay, RenderPlan, TextOverlay,
};

use super::FfmpegCompiler;
use super::util::escape_ffmpeg_path;

const TEXT_COLOR: &str = "white";
const BORDER_COLOR: &str = "black";
const BOX_COLOR: &str = "black@0.5";
const BOX_BORDER_WIDTH: u32 = 10;

impl FfmpegCompiler {
    pub(super) fn build_drawtext_filter(&self, plan: &RenderPlan, overlay: &TextOverlay) -> String {
        let mut filter = format!(
            "drawtext=fontfile='{font}':expansion=none:text='{text}':fontsize={size}:fontcolor={color}:x=(w-text_w)/2:y={y}",
            font = escape_ffmpeg_path(&plan.font_path),
            text = overlay.text.as_str(),
            size = overlay.style.font_size,
            color = TEXT_COLOR,
            y = anchor_y(overlay.position),
        );

        if overlay.style.boxed {
            filter.push_str(&format!(
                ":box=1:boxcolor={BOX_COLOR}:boxborderw={BOX_BORDER_WIDTH}"
            ));
        } else if overlay.style.border_width > 0 {
            filter.push_str(&format!(
                ":borderw={}:bordercolor={BORDER_COLOR}",
                overlay.style.border_width
            ));
        }

        if let Some(window) = overlay.visibility_window {
            filter.push_str(&format!(":enable='{}'", window.enable_expression()));
        }

        filter
    }

    /// Scale and overlay filters for the logo, writing `output_label`.
    pub(super) fn build_logo_filters(
        &self,
        logo: &LogoOverlay,
        base_label: &str,
        output_label: &str,
    ) -> Vec<String> {
        vec![
            format!("[{}:v]scale=-1:{}[logo]", logo.input_index, logo.height),
            format!(
                "[{base_label}][logo]overlay=x={LOGO_LEFT_MARGIN}:y=main_h-overlay_h-{BOTTOM_MARGIN}[{output_label}]"
            ),
        ]
    }
}

fn anchor_y(anchor: Anchor) -> String {
    match anchor {
        Anchor::Top { y } => y.to_string(),
        Anchor::Middle => "(h-text_h)/2".to_string(),
        Anchor::Bottom { margin } => format!("h-text_h-{margin}"),
    }
}
