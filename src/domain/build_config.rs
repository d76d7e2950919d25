//! Firmware build configuration as submitted by clients.
//!
//! The configuration is rendered into a C header snippet that the build
//! script splices into the device firmware before compiling it.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the color table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,

    /// Unrendered per-color fields (labels and the like), kept as sent
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl LedColor {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            extra: Map::new(),
        }
    }
}

/// Client-supplied firmware parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Number of LEDs on the strip
    pub num_leds: u32,

    /// Time each color is held, in milliseconds
    pub wait_color: u32,

    /// Delay between gradient steps, in milliseconds
    pub wait_gradient: u32,

    /// Number of steps in a gradient transition
    pub gradient_steps: u32,

    /// Colors cycled through, in order
    pub colors: Vec<LedColor>,

    /// Any other fields the client sent; stored alongside the build untouched
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl BuildConfig {
    pub fn new(
        num_leds: u32,
        wait_color: u32,
        wait_gradient: u32,
        gradient_steps: u32,
        colors: Vec<LedColor>,
    ) -> Self {
        Self {
            num_leds,
            wait_color,
            wait_gradient,
            gradient_steps,
            colors,
            extra: Map::new(),
        }
    }

    /// Render the `#define` block followed by the color table initializer.
    ///
    /// This is the exact text the build script expects on stdin.
    pub fn render_header(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = write!(
            out,
            "\n#define NUM_LEDS {}\n\n#define WAIT_COLOR_MS {}\n#define WAIT_GRADIENT_MS {}\n#define GRADIENT_STEPS {}\n\n",
            self.num_leds, self.wait_color, self.wait_gradient, self.gradient_steps
        );

        out.push_str("struct cRGB colors[] = {\n");
        for c in &self.colors {
            let _ = writeln!(out, "    {{ .r = {:3}, .g = {:3}, .b = {:3} }},", c.r, c.g, c.b);
        }
        out.push_str("};\n");

        out
    }
}
