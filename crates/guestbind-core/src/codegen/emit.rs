//! Rendering of wrapper plans into Rust source.

use super::{ParamPlan, WrapperPlan};
use crate::config::GeneratorConfig;

const INDENT: &str = "    ";

/// Line-oriented source buffer with indentation tracking.
#[derive(Debug, Default)]
struct SourceWriter {
    buf: String,
    depth: usize,
}

impl SourceWriter {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.buf.push_str(INDENT);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    fn blank(&mut self) {
        self.buf.push('\n');
    }

    /// Emit `header`, then indent until the matching [`SourceWriter::close`].
    fn open(&mut self, header: &str) {
        self.line(header);
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn width(&self, text: &str) -> usize {
        self.depth * INDENT.len() + text.len()
    }

    fn finish(self) -> String {
        self.buf
    }
}

pub(crate) fn render(plans: &[WrapperPlan<'_>], client_name: &str, runtime: &str) -> String {
    let mut w = SourceWriter::default();

    w.line(&format!(
        "// Code generated by {}. DO NOT EDIT.",
        GeneratorConfig::GENERATOR_NAME
    ));
    w.blank();
    if plans.is_empty() {
        w.line(&format!("use {}::GuestClient;", runtime));
    } else {
        w.line(&format!(
            "use {}::{{CancellationToken, GuestClient, Result}};",
            runtime
        ));
    }
    w.blank();

    render_client(&mut w, plans, client_name, runtime);
    for plan in plans {
        w.blank();
        render_args_struct(&mut w, plan, runtime);
    }

    w.finish()
}

fn render_client(
    w: &mut SourceWriter,
    plans: &[WrapperPlan<'_>],
    client_name: &str,
    runtime: &str,
) {
    w.line("/// Typed wrappers over the functions exported by the guest.");
    w.line("#[derive(Debug, Clone)]");
    w.open(&format!("pub struct {} {{", client_name));
    w.line("inner: GuestClient,");
    w.close();
    w.blank();

    w.open(&format!("impl {} {{", client_name));

    w.line("/// Client for the guest binary at `binary_path`.");
    w.open("pub fn new(binary_path: impl Into<::std::path::PathBuf>) -> Self {");
    w.line("Self::from_client(GuestClient::new(binary_path))");
    w.close();
    w.blank();

    w.line("/// Wrap an already configured [`GuestClient`].");
    w.open("pub fn from_client(inner: GuestClient) -> Self {");
    w.line("Self { inner }");
    w.close();
    w.blank();

    w.open("pub fn inner(&self) -> &GuestClient {");
    w.line("&self.inner");
    w.close();

    for plan in plans {
        w.blank();
        render_method(w, plan, runtime);
    }

    w.close();
}

fn render_method(w: &mut SourceWriter, plan: &WrapperPlan<'_>, runtime: &str) {
    let function = plan.function.name();
    let ret = plan.return_type.render(runtime);

    w.line(&format!(
        "/// Calls the guest function `{}`.",
        single_line(function)
    ));
    w.line("///");
    w.line(&format!(
        "/// Guest signature: `{}`",
        single_line(&plan.function.to_string())
    ));

    let mut args = vec!["&self".to_string(), "cancel: &CancellationToken".to_string()];
    args.extend(
        plan.params
            .iter()
            .map(|p| format!("{}: {}", p.ident, p.ty.render(runtime))),
    );

    let one_line = format!(
        "pub async fn {}({}) -> Result<{}> {{",
        plan.method,
        args.join(", "),
        ret
    );
    if w.width(&one_line) <= GeneratorConfig::MAX_SIGNATURE_WIDTH {
        w.open(&one_line);
    } else {
        w.open(&format!("pub async fn {}(", plan.method));
        for arg in &args {
            w.line(&format!("{},", arg));
        }
        w.depth -= 1;
        w.line(&format!(") -> Result<{}> {{", ret));
        w.depth += 1;
    }

    w.line(&format!(
        "let args = {} {};",
        plan.args_struct,
        field_inits(&plan.params)
    ));
    if plan.return_type.is_unit() {
        w.line(&format!(
            "self.inner.call_unit({:?}, &args, cancel).await",
            function
        ));
    } else {
        w.line(&format!(
            "let value = self.inner.call::<_, {}>({:?}, &args, cancel).await?;",
            ret, function
        ));
        w.line(&format!(
            "Ok(value.unwrap_or({}))",
            plan.return_type.zero_value(runtime)
        ));
    }
    w.close();
}

fn render_args_struct(w: &mut SourceWriter, plan: &WrapperPlan<'_>, runtime: &str) {
    w.line(&format!("#[derive({}::serde::Serialize)]", runtime));
    w.line(&format!("#[serde(crate = \"{}::serde\")]", runtime));
    if plan.params.is_empty() {
        w.line(&format!("struct {} {{}}", plan.args_struct));
        return;
    }

    w.open(&format!("struct {} {{", plan.args_struct));
    for param in &plan.params {
        if param.ident != param.original {
            w.line(&format!("#[serde(rename = {:?})]", param.original));
        }
        w.line(&format!("{}: {},", param.ident, param.ty.render(runtime)));
    }
    w.close();
}

fn field_inits(params: &[ParamPlan<'_>]) -> String {
    if params.is_empty() {
        return "{}".to_string();
    }
    let fields: Vec<&str> = params.iter().map(|p| p.ident.as_str()).collect();
    format!("{{ {} }}", fields.join(", "))
}

/// Guest names end up in doc comments; keep them on one line.
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::HostType;
    use crate::descriptor::{FunctionDescriptor, TypeDescriptor};

    fn render_one(function: &FunctionDescriptor, params: Vec<ParamPlan<'_>>) -> String {
        let plan = WrapperPlan {
            function,
            method: "run".to_string(),
            args_struct: "RunArgs".to_string(),
            params,
            return_type: HostType::from_descriptor(function.return_type()),
        };
        render(&[plan], "Client", "guestbind")
    }

    #[test]
    fn test_header_and_client() {
        let source = render(&[], "Client", "guestbind");
        assert!(source.starts_with("// Code generated by guestbind-gen. DO NOT EDIT.\n"));
        assert!(source.contains("use guestbind::GuestClient;"));
        assert!(source.contains("pub struct Client {\n    inner: GuestClient,\n}"));
        assert!(source.contains("pub fn from_client(inner: GuestClient) -> Self {"));
    }

    #[test]
    fn test_unit_return_uses_call_unit() {
        let function = FunctionDescriptor::new(
            "log_message",
            vec![("message".to_string(), TypeDescriptor::String)],
            TypeDescriptor::None,
        );
        let params = vec![ParamPlan {
            original: "message",
            ident: "message".to_string(),
            ty: HostType::Text,
        }];
        let source = render_one(&function, params);
        assert!(source.contains("-> Result<()> {"));
        assert!(source.contains("        let args = RunArgs { message };\n"));
        assert!(source.contains("self.inner.call_unit(\"log_message\", &args, cancel).await\n"));
        assert!(!source.contains("unwrap_or"));
    }

    #[test]
    fn test_value_return_falls_back_to_zero() {
        let function = FunctionDescriptor::new(
            "ratio",
            Vec::<(String, TypeDescriptor)>::new(),
            TypeDescriptor::Float,
        );
        let source = render_one(&function, Vec::new());
        assert!(source.contains("let args = RunArgs {};"));
        assert!(source.contains("self.inner.call::<_, f64>(\"ratio\", &args, cancel).await?;"));
        assert!(source.contains("Ok(value.unwrap_or(0.0))"));
        assert!(source.contains("struct RunArgs {}\n"));
    }

    #[test]
    fn test_renamed_fields_keep_wire_name() {
        let function = FunctionDescriptor::new(
            "resize",
            vec![
                ("maxWidth".to_string(), TypeDescriptor::Int),
                ("type".to_string(), TypeDescriptor::String),
            ],
            TypeDescriptor::Any,
        );
        let params = vec![
            ParamPlan {
                original: "maxWidth",
                ident: "max_width".to_string(),
                ty: HostType::Integer,
            },
            ParamPlan {
                original: "type",
                ident: "type_".to_string(),
                ty: HostType::Text,
            },
        ];
        let source = render_one(&function, params);
        assert!(source.contains("    #[serde(rename = \"maxWidth\")]\n    max_width: i64,\n"));
        assert!(source.contains("    #[serde(rename = \"type\")]\n    type_: String,\n"));
        assert!(source.contains("Ok(value.unwrap_or(guestbind::serde_json::Value::Null))"));
    }

    #[test]
    fn test_long_signature_wraps() {
        let names: Vec<String> = (0..8).map(|i| format!("parameter_{}", i)).collect();
        let function = FunctionDescriptor::new(
            "wide",
            names.iter().map(|n| (n.clone(), TypeDescriptor::String)),
            TypeDescriptor::Bool,
        );
        let params = names
            .iter()
            .map(|n| ParamPlan {
                original: n,
                ident: n.clone(),
                ty: HostType::Text,
            })
            .collect();
        let source = render_one(&function, params);
        assert!(source.contains("    pub async fn run(\n        &self,\n        cancel: &CancellationToken,\n"));
        assert!(source.contains("        parameter_7: String,\n    ) -> Result<bool> {\n"));
    }

    #[test]
    fn test_doc_comment_stays_on_one_line() {
        assert_eq!(single_line("odd\nname"), "odd name");
    }
}
