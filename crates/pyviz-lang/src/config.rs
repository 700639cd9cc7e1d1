use serde::{Deserialize, Serialize};

/// Fixed lane positions and spacing used by the emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// y of the first line.
    pub top: i32,
    pub line_height: i32,
    pub variable_x: i32,
    pub bar_x: i32,
    pub output_x: i32,
    /// Lane for loop headers and conditions.
    pub flow_x: i32,
    /// Extra x offset of loop iteration lines.
    pub indent: i32,
    /// Bar pixels per unit of value.
    pub bar_scale: f64,
    pub bar_max_width: f64,
    pub bar_height: i32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            top: 50,
            line_height: 20,
            variable_x: 50,
            bar_x: 250,
            output_x: 400,
            flow_x: 400,
            indent: 20,
            bar_scale: 2.0,
            bar_max_width: 150.0,
            bar_height: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub layout: Layout,
    /// Iterations each `for`/`while` loop may run before it is cut off.
    pub max_loop_iterations: usize,
    /// Undefined names raise `NameError` and unpack mismatches become errors.
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            max_loop_iterations: 50,
            strict: false,
        }
    }
}

impl EngineConfig {
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_loop_iterations(mut self, n: usize) -> Self {
        self.max_loop_iterations = n;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
