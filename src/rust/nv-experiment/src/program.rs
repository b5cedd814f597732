// Copyright 2026 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Real-time program handed to the runtime.
//!
//! The builder lowers its command list into a [`Program`]: a tree of
//! statements plus the stream-processing outputs. The runtime compiles it;
//! the text rendering is for inspection only.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableType {
    Int,
    Fixed,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::Int => f.write_str("int"),
            VariableType::Fixed => f.write_str("fixed"),
        }
    }
}

/// A real-time value: a literal or the (scaled) loop variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Fixed(f64),
    Var(String),
    Scaled { var: String, scale: f64 },
}

impl Expr {
    /// `scale * var`, or plain `var` for unit scale.
    pub fn swept(var: &str, scale: f64) -> Self {
        if scale == 1.0 {
            Expr::Var(var.to_string())
        } else {
            Expr::Scaled {
                var: var.to_string(),
                scale,
            }
        }
    }

    /// Value of the expression with the loop variable set to `var`.
    pub fn evaluate(&self, var: f64) -> f64 {
        match self {
            Expr::Int(v) => *v as f64,
            Expr::Fixed(v) => *v,
            Expr::Var(_) => var,
            Expr::Scaled { scale, .. } => var * scale,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Fixed(v) => write!(f, "{v:?}"),
            Expr::Var(name) => f.write_str(name),
            Expr::Scaled { var, scale } => write!(f, "{var} * {scale:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Declare {
        name: String,
        ty: VariableType,
        size: Option<usize>,
    },
    DeclareStream {
        name: String,
    },
    Play {
        operation: String,
        element: String,
        amplitude: Option<Expr>,
        /// Clock cycles; the pulse length from the hardware document if absent.
        duration: Option<Expr>,
    },
    /// Idle for `duration` clock cycles on `elements`, or on all elements.
    Wait {
        duration: Expr,
        elements: Vec<String>,
    },
    Align,
    UpdateFrequency {
        element: String,
        frequency: Expr,
    },
    /// Photon time tagging into `times`, count written to `target`.
    Measure {
        operation: String,
        element: String,
        times: String,
        /// Acquisition window in nanoseconds.
        length: i64,
        target: String,
    },
    Save {
        variable: String,
        stream: String,
    },
    For {
        variable: String,
        start: i64,
        stop: i64,
        body: Block,
    },
    ForEach {
        variable: String,
        values: Vec<f64>,
        body: Block,
    },
}

fn indent(s: &str, prefix: &str) -> String {
    s.lines()
        .flat_map(|line| [prefix, line, "\n"].into_iter())
        .collect()
}

fn quoted_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("\"{item}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// An ordered list of statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    statements: Vec<Statement>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn add_declaration<S: Into<String>>(&mut self, name: S, ty: VariableType) {
        self.add_statement(Statement::Declare {
            name: name.into(),
            ty,
            size: None,
        });
    }

    pub fn add_array_declaration<S: Into<String>>(
        &mut self,
        name: S,
        ty: VariableType,
        size: usize,
    ) {
        self.add_statement(Statement::Declare {
            name: name.into(),
            ty,
            size: Some(size),
        });
    }

    pub fn add_stream_declaration<S: Into<String>>(&mut self, name: S) {
        self.add_statement(Statement::DeclareStream { name: name.into() });
    }

    pub fn add_play<S1: Into<String>, S2: Into<String>>(
        &mut self,
        operation: S1,
        element: S2,
        amplitude: Option<Expr>,
        duration: Option<Expr>,
    ) {
        self.add_statement(Statement::Play {
            operation: operation.into(),
            element: element.into(),
            amplitude,
            duration,
        });
    }

    pub fn add_wait(&mut self, duration: Expr, element: Option<&str>) {
        self.add_statement(Statement::Wait {
            duration,
            elements: element.into_iter().map(str::to_string).collect(),
        });
    }

    pub fn add_align(&mut self) {
        self.add_statement(Statement::Align);
    }

    pub fn add_update_frequency<S: Into<String>>(&mut self, element: S, frequency: Expr) {
        self.add_statement(Statement::UpdateFrequency {
            element: element.into(),
            frequency,
        });
    }

    pub fn add_measure<S1: Into<String>, S2: Into<String>>(
        &mut self,
        operation: S1,
        element: S2,
        times: &str,
        length: i64,
        target: &str,
    ) {
        self.add_statement(Statement::Measure {
            operation: operation.into(),
            element: element.into(),
            times: times.to_string(),
            length,
            target: target.to_string(),
        });
    }

    pub fn add_save(&mut self, variable: &str, stream: &str) {
        self.add_statement(Statement::Save {
            variable: variable.to_string(),
            stream: stream.to_string(),
        });
    }

    pub fn add_for(&mut self, variable: &str, start: i64, stop: i64, body: Block) {
        self.add_statement(Statement::For {
            variable: variable.to_string(),
            start,
            stop,
            body,
        });
    }

    pub fn add_for_each(&mut self, variable: &str, values: Vec<f64>, body: Block) {
        self.add_statement(Statement::ForEach {
            variable: variable.to_string(),
            values,
            body,
        });
    }

    pub fn generate_text(&self) -> String {
        self.statements
            .iter()
            .map(|statement| self.emit_statement(statement))
            .collect::<String>()
    }

    fn emit_statement(&self, statement: &Statement) -> String {
        match statement {
            Statement::Declare { name, ty, size } => match size {
                Some(size) => format!("{name} = declare({ty}, size={size});\n"),
                None => format!("{name} = declare({ty});\n"),
            },
            Statement::DeclareStream { name } => format!("{name} = declare_stream();\n"),
            Statement::Play {
                operation,
                element,
                amplitude,
                duration,
            } => {
                let pulse = match amplitude {
                    Some(amplitude) => format!("\"{operation}\" * amp({amplitude})"),
                    None => format!("\"{operation}\""),
                };
                let duration = duration
                    .as_ref()
                    .map(|d| format!(", duration={d}"))
                    .unwrap_or_default();
                format!("play({pulse}, \"{element}\"{duration});\n")
            }
            Statement::Wait { duration, elements } => {
                if elements.is_empty() {
                    format!("wait({duration});\n")
                } else {
                    format!("wait({duration}, {});\n", quoted_list(elements))
                }
            }
            Statement::Align => "align();\n".to_string(),
            Statement::UpdateFrequency { element, frequency } => {
                format!("update_frequency(\"{element}\", {frequency});\n")
            }
            Statement::Measure {
                operation,
                element,
                times,
                length,
                target,
            } => format!(
                "measure(\"{operation}\", \"{element}\", time_tagging.analog({times}, {length}, {target}));\n"
            ),
            Statement::Save { variable, stream } => format!("save({variable}, {stream});\n"),
            Statement::For {
                variable,
                start,
                stop,
                body,
            } => {
                let body = indent(&body.generate_text(), "  ");
                format!(
                    "for ({variable} = {start}; {variable} < {stop}; {variable} += 1) {{\n{body}}}\n"
                )
            }
            Statement::ForEach {
                variable,
                values,
                body,
            } => {
                let values = values
                    .iter()
                    .map(|v| format!("{v:?}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let body = indent(&body.generate_text(), "  ");
                format!("for_each ({variable} in [{values}]) {{\n{body}}}\n")
            }
        }
    }

    /// Depth-first iteration over this block and all nested loop bodies.
    pub fn walk(&self) -> Vec<&Statement> {
        let mut out = Vec::new();
        for statement in &self.statements {
            out.push(statement);
            match statement {
                Statement::For { body, .. } | Statement::ForEach { body, .. } => {
                    out.extend(body.walk());
                }
                _ => {}
            }
        }
        out
    }
}

/// A stream reduced on the processor and saved under `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutput {
    pub stream: String,
    /// Reshape into rows of this length before averaging.
    pub buffer: Option<usize>,
    pub average: bool,
    pub name: String,
}

impl fmt::Display for StreamOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stream)?;
        if let Some(len) = self.buffer {
            write!(f, ".buffer({len})")?;
        }
        if self.average {
            write!(f, ".average()")?;
        }
        write!(f, ".save(\"{}\")", self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    body: Block,
    streams: Vec<StreamOutput>,
}

impl Program {
    pub fn new(body: Block, streams: Vec<StreamOutput>) -> Self {
        Program { body, streams }
    }

    pub fn body(&self) -> &Block {
        &self.body
    }

    pub fn stream_outputs(&self) -> &[StreamOutput] {
        &self.streams
    }

    /// Names under which results are saved, in declaration order.
    pub fn result_names(&self) -> Vec<&str> {
        self.streams.iter().map(|s| s.name.as_str()).collect()
    }

    /// Values of the first scanning loop.
    pub fn sweep_values(&self) -> Option<&[f64]> {
        self.body.walk().into_iter().find_map(|statement| match statement {
            Statement::ForEach { values, .. } => Some(values.as_slice()),
            _ => None,
        })
    }

    /// Iteration count of the outermost counting loop.
    pub fn averages(&self) -> Option<i64> {
        self.body
            .statements()
            .iter()
            .find_map(|statement| match statement {
                Statement::For { start, stop, .. } => Some(stop - start),
                _ => None,
            })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "program {{")?;
        write!(f, "{}", indent(&self.body.generate_text(), "  "))?;
        writeln!(f, "}}")?;
        writeln!(f, "stream_processing {{")?;
        for stream in &self.streams {
            writeln!(f, "  {stream};")?;
        }
        writeln!(f, "}}")
    }
}
