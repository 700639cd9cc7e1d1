//! The color rule: every tone the emitter can produce maps to exactly one color.

use crate::runtime::value::Value;
use crate::types::visual::Rgb;

/// Coarse class of a value, for coloring variable lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Numeric,
    String,
    Other,
}

impl ValueClass {
    /// Bools count as numeric, as Python's `bool` is an `int`.
    pub fn of(v: &Value) -> Self {
        match v {
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => Self::Numeric,
            Value::Str(_) => Self::String,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tone {
    Value(ValueClass),
    Output,
    AugAssign,
    LoopStart,
    LoopIteration,
    Truncation,
    Condition(bool),
    FunctionDef,
    FunctionResult,
    CallEcho,
    ExpressionResult,
    Return,
    Debug,
    Error,
    BarPositive,
    BarNegative,
    Background,
}

impl Tone {
    pub const ALL: [Tone; 19] = [
        Tone::Value(ValueClass::Numeric),
        Tone::Value(ValueClass::String),
        Tone::Value(ValueClass::Other),
        Tone::Output,
        Tone::AugAssign,
        Tone::LoopStart,
        Tone::LoopIteration,
        Tone::Truncation,
        Tone::Condition(true),
        Tone::Condition(false),
        Tone::FunctionDef,
        Tone::FunctionResult,
        Tone::CallEcho,
        Tone::ExpressionResult,
        Tone::Return,
        Tone::Debug,
        Tone::Error,
        Tone::BarPositive,
        Tone::BarNegative,
    ];

    pub fn color(self) -> Rgb {
        match self {
            Tone::Value(ValueClass::Numeric) => Rgb::new(0xff, 0xff, 0x00),
            Tone::Value(ValueClass::String)  => Rgb::new(0x00, 0xff, 0x00),
            Tone::Value(ValueClass::Other)   => Rgb::new(0xff, 0x88, 0xff),
            Tone::Output                     => Rgb::new(0x88, 0xff, 0xff),
            Tone::AugAssign                  => Rgb::new(0x88, 0xff, 0xff),
            Tone::LoopStart                  => Rgb::new(0x88, 0xff, 0x88),
            Tone::LoopIteration              => Rgb::new(0x88, 0xff, 0xff),
            Tone::Truncation                 => Rgb::new(0xff, 0x88, 0x44),
            Tone::Condition(true)            => Rgb::new(0xff, 0xff, 0x88),
            Tone::Condition(false)           => Rgb::new(0xff, 0x88, 0x88),
            Tone::FunctionDef                => Rgb::new(0xff, 0x88, 0xff),
            Tone::FunctionResult             => Rgb::new(0xff, 0x88, 0xff),
            Tone::CallEcho                   => Rgb::new(0xff, 0xff, 0x88),
            Tone::ExpressionResult           => Rgb::new(0xcc, 0xcc, 0xcc),
            Tone::Return                     => Rgb::new(0xff, 0x88, 0xff),
            Tone::Debug                      => Rgb::new(0x88, 0x88, 0x88),
            Tone::Error                      => Rgb::new(0xff, 0x44, 0x44),
            Tone::BarPositive                => Rgb::new(0x00, 0xff, 0x00),
            Tone::BarNegative                => Rgb::new(0xff, 0x00, 0x00),
            Tone::Background                 => Rgb::new(0x00, 0x11, 0x00),
        }
    }
}

/// Canvas background behind rendered elements.
pub const BACKGROUND: Rgb = Rgb::new(0x00, 0x11, 0x00);
