//! Template engine based on MiniJinja

use kontemplate_core::{Context, ResourceSetDeclaration, ResourceSetKind, Values};
use minijinja::{Environment, State, Value};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use crate::error::{RenderReport, Result, TemplateError, TemplateErrorKind};
use crate::filters;
use crate::functions;

/// File extensions treated as templates
const TEMPLATE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Per-set default variable files; never rendered themselves
const DEFAULT_VALUE_FILES: &[&str] = &["default.yaml", "default.yml", "default.json"];

/// A single rendered template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResource {
    /// File name of the template, relative to the resource set directory
    pub filename: String,
    pub rendered: String,
}

/// A resource set after templating, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResourceSet {
    pub name: String,
    pub kind: ResourceSetKind,
    pub chart: Option<String>,
    /// Extra arguments appended to the dispatch command
    pub args: Vec<String>,
    /// Rendered templates in lexicographic file order
    pub resources: Vec<RenderedResource>,
}

impl RenderedResourceSet {
    /// Whether nothing was rendered for this set
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Result of rendering a context
#[derive(Debug)]
pub struct RenderOutput {
    /// Selected resource sets in declaration order, including empty ones
    pub sets: Vec<RenderedResourceSet>,

    /// Files that failed to render and were left out
    pub report: RenderReport,
}

/// The template engine
///
/// Undefined variables always fail the file being rendered.
#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

impl Engine {
    /// Create a MiniJinja environment bound to one resource set directory
    fn create_environment(&self, base_dir: &Path, variables: &JsonValue) -> Environment<'static> {
        let mut env = Environment::new();

        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_debug(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
        env.set_loader(minijinja::path_loader(base_dir));

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("tojson_pretty", filters::tojson_pretty);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("quote", filters::quote);
        env.add_filter("squote", filters::squote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("indent", filters::indent);
        env.add_filter("sha256", filters::sha256sum);

        env.add_function("fail", functions::fail);
        env.add_function("lookup_ip_addr", functions::lookup_ip_addr);
        env.add_function("pass_lookup", functions::pass_lookup);

        let dir = base_dir.to_path_buf();
        env.add_function("insert_file", move |path: String| {
            functions::insert_file(&dir, &path)
        });

        let vars = variables.clone();
        env.add_function("insert_template", move |state: &State, path: String| {
            functions::insert_template(state, &vars, &path)
        });

        env
    }

    /// Render a single template string against a variable mapping
    ///
    /// Helper functions resolve files relative to the working directory.
    pub fn render_string(
        &self,
        template: &str,
        values: &Values,
        template_name: &str,
    ) -> Result<String> {
        let env = self.create_environment(Path::new("."), values.inner());

        env.render_named_str(template_name, template, Value::from_serialize(values.inner()))
            .map_err(|e| {
                TemplateError::from_minijinja(e, template_name, template, Some(values.inner()))
            })
    }

    /// Render every selected resource set of a context
    ///
    /// With a non-empty `include`, only matching sets are rendered; `exclude`
    /// then removes sets from whatever remains. Sets keep their declaration
    /// order, and sets without any rendered file are kept so callers can
    /// warn about them.
    pub fn render(
        &self,
        context: &Context,
        include: &[String],
        exclude: &[String],
    ) -> RenderOutput {
        let mut report = RenderReport::new();

        let sets = context
            .resource_sets
            .iter()
            .filter(|rs| is_selected(rs, include, exclude))
            .map(|rs| self.render_resource_set(rs, &mut report))
            .collect();

        RenderOutput { sets, report }
    }

    /// Render one resource set, recording per-file failures in `report`
    pub fn render_resource_set(
        &self,
        rs: &ResourceSetDeclaration,
        report: &mut RenderReport,
    ) -> RenderedResourceSet {
        let mut rendered = RenderedResourceSet {
            name: rs.name.clone(),
            kind: rs.kind,
            chart: rs.chart.clone(),
            args: rs.args.clone(),
            resources: Vec::new(),
        };

        let (base_dir, files) = match template_files(&rs.path) {
            Ok(Some(found)) => found,
            Ok(None) => {
                tracing::debug!(
                    resource_set = %rs.name,
                    "no templates at {}",
                    rs.path.display()
                );
                return rendered;
            }
            Err(e) => {
                report.record_failure(rs.name.clone(), TemplateError::io(&rs.path, &e));
                return rendered;
            }
        };

        let mut variables = load_defaults(&base_dir, &rs.name, report);
        variables.merge(&rs.values);

        let env = self.create_environment(&base_dir, variables.inner());
        let ctx = Value::from_serialize(variables.inner());

        for file in files {
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let key = format!("{}/{}", rs.name, filename);

            let source = match std::fs::read_to_string(&file) {
                Ok(source) => source,
                Err(e) => {
                    report.record_failure(key, TemplateError::io(&file, &e));
                    continue;
                }
            };

            match env.render_named_str(&filename, &source, &ctx) {
                Ok(text) => {
                    tracing::debug!(resource_set = %rs.name, file = %filename, "rendered template");
                    report.record_success(key);
                    rendered.resources.push(RenderedResource {
                        filename,
                        rendered: text,
                    });
                }
                Err(e) => {
                    report.record_failure(
                        key.clone(),
                        TemplateError::from_minijinja(e, &key, &source, Some(variables.inner())),
                    );
                }
            }
        }

        rendered
    }
}

/// Whether a resource set survives the include/exclude filters
///
/// Exclude always wins over include.
pub fn is_selected(rs: &ResourceSetDeclaration, include: &[String], exclude: &[String]) -> bool {
    let included = include.is_empty() || include.iter().any(|s| rs.matches(s));
    included && !exclude.iter().any(|s| rs.matches(s))
}

/// Locate the templates of a resource set
///
/// Returns the directory helpers resolve against plus the template files in
/// lexicographic order, or `None` when the path does not exist.
fn template_files(path: &Path) -> std::io::Result<Option<(PathBuf, Vec<PathBuf>)>> {
    if path.is_file() {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        return Ok(Some((dir, vec![path.to_path_buf()])));
    }

    if !path.is_dir() {
        return Ok(None);
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        if DEFAULT_VALUE_FILES.contains(&entry.file_name().to_string_lossy().as_ref()) {
            continue;
        }

        let is_template = entry
            .path()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext.as_str()));

        if is_template {
            files.push(entry.into_path());
        }
    }

    Ok(Some((path.to_path_buf(), files)))
}

/// Load the first per-set default variable file found in `dir`
fn load_defaults(dir: &Path, set_name: &str, report: &mut RenderReport) -> Values {
    for name in DEFAULT_VALUE_FILES {
        let path = dir.join(name);
        if !path.is_file() {
            continue;
        }

        return match Values::from_file(&path) {
            Ok(values) => values,
            Err(e) => {
                let error = TemplateError::simple(TemplateErrorKind::Io, e.to_string());
                report.record_failure(format!("{}/{}", set_name, name), error);
                Values::new()
            }
        };
    }

    Values::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontemplate_core::parse_var_overrides;
    use std::fs;
    use tempfile::TempDir;

    fn values(yaml: &str) -> Values {
        Values::from_yaml(yaml).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn load_context(dir: &TempDir, config: &str, vars: &[&str]) -> Context {
        write(dir.path(), "cluster.yaml", config);
        let vars: Vec<String> = vars.iter().map(|s| s.to_string()).collect();
        let overrides = parse_var_overrides(&vars).unwrap();
        Context::load(dir.path().join("cluster.yaml"), &overrides).unwrap()
    }

    fn names(output: &RenderOutput) -> Vec<&str> {
        output.sets.iter().map(|rs| rs.name.as_str()).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_simple() {
        let engine = Engine::default();
        let result = engine
            .render_string("replicas: {{ REPLICAS }}", &values("REPLICAS: 3"), "test.yaml")
            .unwrap();

        assert_eq!(result, "replicas: 3");
    }

    #[test]
    fn test_render_with_filters() {
        let engine = Engine::default();
        let vals = values("image:\n  repository: nginx\n  tag: '1.25'\n");

        let template = "image:{{ image | toyaml | nindent(2) }}";
        let result = engine.render_string(template, &vals, "test.yaml").unwrap();

        insta::assert_snapshot!(result, @r"
        image:
          repository: nginx
          tag: '1.25'
        ");
    }

    #[test]
    fn test_undefined_variable_fails() {
        let engine = Engine::default();
        let err = engine
            .render_string("replicas: {{ REPLICA }}", &values("REPLICAS: 3"), "test.yaml")
            .unwrap_err();

        assert_eq!(err.kind(), TemplateErrorKind::UndefinedVariable);
        assert!(err.suggestion.unwrap().contains("REPLICAS"));
    }

    #[test]
    fn test_syntax_error() {
        let engine = Engine::default();
        let err = engine
            .render_string("replicas: {{ REPLICAS", &values("REPLICAS: 3"), "test.yaml")
            .unwrap_err();

        assert_eq!(err.kind(), TemplateErrorKind::SyntaxError);
    }

    #[test]
    fn test_render_resource_sets_in_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "frontend/b-service.yaml", "port: {{ PORT }}\n");
        write(dir.path(), "frontend/a-deployment.yaml", "replicas: {{ REPLICAS }}\n");
        write(dir.path(), "frontend/README.md", "not a template {{ nope }}");
        write(dir.path(), "backend/deployment.yml", "name: backend\n");

        let ctx = load_context(
            &dir,
            r#"
context: staging
global:
  REPLICAS: 3
  PORT: 80
include:
  - name: frontend
    values:
      REPLICAS: 5
  - name: backend
"#,
            &[],
        );

        let output = Engine::default().render(&ctx, &[], &[]);

        assert!(!output.report.has_errors());
        assert_eq!(names(&output), vec!["frontend", "backend"]);

        let frontend = &output.sets[0];
        let files: Vec<&str> = frontend.resources.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(files, vec!["a-deployment.yaml", "b-service.yaml"]);
        assert_eq!(frontend.resources[0].rendered, "replicas: 5\n");
        assert_eq!(frontend.resources[1].rendered, "port: 80\n");
    }

    #[test]
    fn test_render_is_deterministic() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "web/deployment.yaml",
            "labels: {{ labels | tojson }}\nchecksum: {{ labels | tojson | sha256 }}\n",
        );
        let ctx = load_context(
            &dir,
            r#"
context: prod
include:
  - name: web
    values:
      labels: { app: web, tier: frontend, team: core }
"#,
            &[],
        );

        let engine = Engine::default();
        let first = engine.render(&ctx, &[], &[]);
        let second = engine.render(&ctx, &[], &[]);

        assert_eq!(first.sets, second.sets);
    }

    #[test]
    fn test_include_and_exclude_filters() {
        let dir = TempDir::new().unwrap();
        for set in ["a", "b", "c"] {
            write(dir.path(), &format!("{}/x.yaml", set), "kind: ConfigMap\n");
        }
        let ctx = load_context(
            &dir,
            "context: prod\ninclude:\n  - name: a\n  - name: b\n  - name: c\n",
            &[],
        );
        let engine = Engine::default();

        let all = engine.render(&ctx, &[], &[]);
        assert_eq!(names(&all), vec!["a", "b", "c"]);

        let included = engine.render(&ctx, &strings(&["c", "a"]), &[]);
        assert_eq!(names(&included), vec!["a", "c"]);

        let excluded = engine.render(&ctx, &[], &strings(&["b"]));
        assert_eq!(names(&excluded), vec!["a", "c"]);

        // Exclude vetoes a set that is also included
        let both = engine.render(&ctx, &strings(&["a", "b"]), &strings(&["b"]));
        assert_eq!(names(&both), vec!["a"]);
    }

    #[test]
    fn test_filters_select_nested_sets_by_parent() {
        let dir = TempDir::new().unwrap();
        let ctx = load_context(
            &dir,
            r#"
context: prod
include:
  - name: monitoring
    include:
      - name: prometheus
      - name: grafana
  - name: web
"#,
            &[],
        );
        let engine = Engine::default();

        let output = engine.render(&ctx, &strings(&["monitoring"]), &[]);
        assert_eq!(names(&output), vec!["monitoring/prometheus", "monitoring/grafana"]);

        let output =
            engine.render(&ctx, &strings(&["monitoring"]), &strings(&["monitoring/grafana"]));
        assert_eq!(names(&output), vec!["monitoring/prometheus"]);
    }

    #[test]
    fn test_failed_file_is_skipped_and_reported() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/a.yaml", "ok: {{ PORT }}\n");
        write(dir.path(), "web/b.yaml", "broken: {{ MISSING }}\n");
        write(dir.path(), "web/c.yaml", "broken: {{ PORT \n");
        write(dir.path(), "api/d.yaml", "ok: true\n");
        let ctx = load_context(
            &dir,
            "context: prod\nglobal:\n  PORT: 80\ninclude:\n  - name: web\n  - name: api\n",
            &[],
        );

        let output = Engine::default().render(&ctx, &[], &[]);

        let web = &output.sets[0];
        assert_eq!(web.resources.len(), 1);
        assert_eq!(web.resources[0].filename, "a.yaml");
        assert_eq!(output.sets[1].resources.len(), 1);

        assert_eq!(output.report.error_count(), 2);
        assert!(output.report.failures.contains_key("web/b.yaml"));
        assert!(output.report.failures.contains_key("web/c.yaml"));
    }

    #[test]
    fn test_missing_or_empty_sets_are_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken/only.yaml", "{{ NOPE }}");
        let ctx = load_context(
            &dir,
            "context: prod\ninclude:\n  - name: missing\n  - name: broken\n",
            &[],
        );

        let output = Engine::default().render(&ctx, &[], &[]);

        assert_eq!(names(&output), vec!["missing", "broken"]);
        assert!(output.sets.iter().all(RenderedResourceSet::is_empty));
        // Only the failed file is a report entry; the missing path is not
        assert_eq!(output.report.error_count(), 1);
    }

    #[test]
    fn test_single_file_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "manifests/namespace.yaml", "name: {{ NS }}\n");
        let ctx = load_context(
            &dir,
            r#"
context: prod
include:
  - name: ns
    path: manifests/namespace.yaml
    values: { NS: team-a }
"#,
            &[],
        );

        let output = Engine::default().render(&ctx, &[], &[]);
        assert_eq!(output.sets[0].resources[0].filename, "namespace.yaml");
        assert_eq!(output.sets[0].resources[0].rendered, "name: team-a\n");
    }

    #[test]
    fn test_defaults_file_is_lowest_precedence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/default.yaml", "PORT: 8080\nTIER: default\nNAME: web\n");
        write(
            dir.path(),
            "web/svc.yaml",
            "port: {{ PORT }}\ntier: {{ TIER }}\nname: {{ NAME }}\n",
        );
        let ctx = load_context(
            &dir,
            "context: prod\nglobal:\n  TIER: global\ninclude:\n  - name: web\n",
            &["NAME=override"],
        );

        let output = Engine::default().render(&ctx, &[], &[]);
        let web = &output.sets[0];

        assert_eq!(web.resources.len(), 1, "default.yaml must not be rendered");
        assert_eq!(web.resources[0].rendered, "port: 8080\ntier: global\nname: override\n");
    }

    #[test]
    fn test_overrides_render_as_given() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/deploy.yaml", "image: app:{{ TAG }}\nzip: {{ ZIP }}\n");
        let ctx = load_context(
            &dir,
            "context: prod\ninclude:\n  - name: web\n",
            &["TAG=1.10", "ZIP=007"],
        );

        let output = Engine::default().render(&ctx, &[], &[]);

        assert_eq!(output.sets[0].resources[0].rendered, "image: app:1.10\nzip: 007\n");
    }

    #[test]
    fn test_helm_sets_render_values_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "db/values.yaml", "replicaCount: {{ REPLICAS }}\n");
        let ctx = load_context(
            &dir,
            r#"
context: prod
global:
  REPLICAS: 2
include:
  - name: db
    type: helm
    chart: bitnami/postgresql
    args: ["--version", "12.1.0"]
"#,
            &[],
        );

        let output = Engine::default().render(&ctx, &[], &[]);
        let db = &output.sets[0];

        assert_eq!(db.kind, ResourceSetKind::Helm);
        assert_eq!(db.chart.as_deref(), Some("bitnami/postgresql"));
        assert_eq!(db.args, vec!["--version", "12.1.0"]);
        assert_eq!(db.resources[0].rendered, "replicaCount: 2\n");
    }

    #[test]
    fn test_insert_helpers() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/files/nginx.conf", "listen {{ PORT }};\n");
        write(dir.path(), "web/partials/labels.txt", "app: {{ NAME }}");
        write(
            dir.path(),
            "web/config.yaml",
            concat!(
                "raw: {{ insert_file('files/nginx.conf') | trim }}\n",
                "{{ insert_template('partials/labels.txt') }}\n",
            ),
        );
        let ctx = load_context(
            &dir,
            "context: prod\ninclude:\n  - name: web\n    values: { PORT: 80, NAME: web }\n",
            &[],
        );

        let output = Engine::default().render(&ctx, &[], &[]);

        assert!(!output.report.has_errors(), "{:?}", output.report);
        assert_eq!(
            output.sets[0].resources[0].rendered,
            "raw: listen {{ PORT }};\napp: web\n"
        );
    }

    #[test]
    fn test_insert_template_recursion_is_bounded() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "web/loop.txt", "{{ insert_template('loop.txt') }}");
        write(dir.path(), "web/main.yaml", "{{ insert_template('loop.txt') }}");
        let ctx = load_context(&dir, "context: prod\ninclude:\n  - name: web\n", &[]);

        let output = Engine::default().render(&ctx, &[], &[]);

        assert!(output.sets[0].is_empty());
        assert!(output.report.failures.contains_key("web/main.yaml"));
    }
}
