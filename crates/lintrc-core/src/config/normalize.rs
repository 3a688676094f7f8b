//! Flattening one config into an ordered element sequence
//!
//! For each config node the yield order is: elements of every `extends`
//! entry (recursively), synthesized extension-processor children, the
//! body element, then each `overrides` entry in order. A parent's file
//! predicate conjoins onto everything its subtree yields.
//!
//! The sequence is demand-driven: `ElementStream` keeps an explicit task
//! queue and materializes one element per pull, performing any file
//! loading inline. A consumer may stop early and no further I/O happens.

use indexmap::IndexMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use super::data::{ConfigData, PluginsField, StringOrList};
use super::element::ConfigElement;
use super::factory::ConfigArrayFactory;
use super::matcher::FileMatcher;
use super::resolve::ExtendsTarget;
use super::validate::{RawConfig, RawFragment};
use crate::error::LintrcError;
use crate::Result;

/// Loading context threaded through one flattening pass
#[derive(Debug, Clone)]
pub(crate) struct NormalizeCtx {
    /// Origin config file; empty for in-memory configs
    pub file_path: PathBuf,
    /// Directory relative glob patterns are matched against
    pub match_base_path: PathBuf,
    /// Logical name chain
    pub name: String,
    /// Accumulated predicate of enclosing nodes
    pub criteria: Option<FileMatcher>,
    /// Set under `extends`: extended configs never contribute `root`
    pub strip_root: bool,
}

impl NormalizeCtx {
    pub(crate) fn new(file_path: PathBuf, match_base_path: PathBuf, name: String) -> Self {
        Self {
            file_path,
            match_base_path,
            name,
            criteria: None,
            strip_root: false,
        }
    }

    /// The path plugin/parser resolution is relative to
    fn importer(&self) -> PathBuf {
        if self.file_path.as_os_str().is_empty() {
            // In-memory configs resolve against the match base directory
            self.match_base_path.join(".eslintrc")
        } else {
            self.file_path.clone()
        }
    }
}

enum Task {
    /// Flatten one config node
    Data { data: Box<ConfigData>, ctx: NormalizeCtx },
    /// Resolve and flatten one `extends` entry
    Extend { request: String, ctx: NormalizeCtx },
    /// Resolve parser/plugins and emit the body element (runs after the
    /// node's `extends` entries have been consumed)
    Body {
        body: Box<ConfigData>,
        criteria: Option<FileMatcher>,
        ctx: NormalizeCtx,
    },
    Emit(Box<ConfigElement>),
}

/// Demand-driven element sequence for one config source
pub(crate) struct ElementStream<'a> {
    factory: &'a ConfigArrayFactory,
    queue: VecDeque<Task>,
    fused: bool,
}

impl<'a> ElementStream<'a> {
    pub(crate) fn for_data(
        factory: &'a ConfigArrayFactory,
        data: ConfigData,
        ctx: NormalizeCtx,
    ) -> Self {
        Self {
            factory,
            queue: VecDeque::from([Task::Data {
                data: Box::new(data),
                ctx,
            }]),
            fused: false,
        }
    }

    pub(crate) fn for_raw(
        factory: &'a ConfigArrayFactory,
        raw: RawConfig,
        ctx: NormalizeCtx,
    ) -> Self {
        let mut stream = Self {
            factory,
            queue: VecDeque::new(),
            fused: false,
        };
        let tasks = tasks_for_raw(raw, &ctx);
        stream.queue.extend(tasks);
        stream
    }

    fn push_front_in_order(&mut self, tasks: Vec<Task>) {
        for task in tasks.into_iter().rev() {
            self.queue.push_front(task);
        }
    }

    fn step(&mut self, task: Task) -> Result<Option<ConfigElement>> {
        match task {
            Task::Emit(element) => Ok(Some(*element)),
            Task::Data { data, ctx } => {
                self.expand_data(*data, ctx)?;
                Ok(None)
            }
            Task::Extend { request, ctx } => {
                self.expand_extend(&request, ctx)?;
                Ok(None)
            }
            Task::Body { body, criteria, ctx } => {
                self.expand_body(*body, criteria, ctx)?;
                Ok(None)
            }
        }
    }

    fn expand_data(&mut self, mut data: ConfigData, ctx: NormalizeCtx) -> Result<()> {
        let files = data.files.take();
        let excluded = data.excluded_files.take();
        let extends = data.extends.take();
        let overrides = data.overrides.take();

        let own = FileMatcher::create(
            files.as_ref().map(StringOrList::as_slice).unwrap_or(&[]),
            excluded.as_ref().map(StringOrList::as_slice).unwrap_or(&[]),
            &ctx.match_base_path,
        )
        .map_err(|e| match e {
            LintrcError::InvalidConfig { detail, .. } => {
                LintrcError::invalid_config(&ctx.file_path, detail)
            }
            other => other,
        })?;
        let criteria = FileMatcher::and_optional(ctx.criteria.clone(), own);

        let mut tasks = Vec::new();

        if let Some(extends) = extends {
            for request in extends.as_slice() {
                tasks.push(Task::Extend {
                    request: request.clone(),
                    ctx: NormalizeCtx {
                        criteria: criteria.clone(),
                        ..ctx.clone()
                    },
                });
            }
        }

        tasks.push(Task::Body {
            body: Box::new(data),
            criteria: criteria.clone(),
            ctx: ctx.clone(),
        });

        if let Some(overrides) = overrides {
            for (index, override_data) in overrides.into_iter().enumerate() {
                tasks.push(Task::Data {
                    data: Box::new(override_data),
                    ctx: NormalizeCtx {
                        name: format!("{}#overrides[{index}]", ctx.name),
                        criteria: criteria.clone(),
                        ..ctx.clone()
                    },
                });
            }
        }

        self.push_front_in_order(tasks);
        Ok(())
    }

    fn expand_body(
        &mut self,
        body: ConfigData,
        criteria: Option<FileMatcher>,
        ctx: NormalizeCtx,
    ) -> Result<()> {
        let importer = ctx.importer();
        let resolver = self.factory.resolver();

        let parser = body
            .parser
            .as_ref()
            .map(|name| resolver.resolve_parser(name, &importer));

        let plugins = match &body.plugins {
            Some(PluginsField::List(names)) => {
                let mut references = IndexMap::new();
                for name in names {
                    let reference = resolver.resolve_plugin(name, &importer)?;
                    references.insert(reference.id().to_string(), reference);
                }
                Some(references)
            }
            Some(PluginsField::Map(mapping)) => {
                let mut references = IndexMap::new();
                for (prefix, module) in mapping {
                    let reference = resolver.resolve_plugin_with_id(module, prefix, &importer)?;
                    references.insert(prefix.clone(), reference);
                }
                Some(references)
            }
            None => None,
        };

        let mut tasks = Vec::new();

        // Plugins register extension processors by synthesizing a child
        // config per `.ext`-style processor id
        if let Some(references) = &plugins {
            for (id, reference) in references {
                let Some(definition) = reference.loaded() else {
                    continue;
                };
                for processor_id in definition.processors.keys() {
                    if !processor_id.starts_with('.') {
                        continue;
                    }
                    let child = ConfigData {
                        files: Some(StringOrList::One(format!("*{processor_id}"))),
                        processor: Some(format!("{id}/{processor_id}")),
                        ..ConfigData::default()
                    };
                    tasks.push(Task::Data {
                        data: Box::new(child),
                        ctx: NormalizeCtx {
                            name: format!("{}#processors[\"{id}/{processor_id}\"]", ctx.name),
                            criteria: criteria.clone(),
                            ..ctx.clone()
                        },
                    });
                }
            }
        }

        let root = if criteria.is_some() || ctx.strip_root {
            None
        } else {
            body.root
        };

        tasks.push(Task::Emit(Box::new(ConfigElement {
            name: ctx.name.clone(),
            file_path: ctx.file_path.clone(),
            criteria,
            env: body.env,
            globals: body.globals,
            parser,
            parser_options: body.parser_options,
            plugins,
            processor: body.processor,
            root,
            rules: body.rules,
            settings: body.settings,
            ecma_features: body.ecma_features,
        })));

        self.push_front_in_order(tasks);
        Ok(())
    }

    fn expand_extend(&mut self, request: &str, ctx: NormalizeCtx) -> Result<()> {
        let importer = ctx.importer();
        let child_name = format!("{} » {request}", ctx.name);
        tracing::debug!("Extending '{}' with '{request}'", ctx.name);

        let target = self.factory.resolver().resolve_extends(request, &importer)?;
        match target {
            ExtendsTarget::Builtin { data } => {
                self.queue.push_front(Task::Data {
                    data: Box::new(data),
                    ctx: NormalizeCtx {
                        file_path: PathBuf::new(),
                        name: child_name,
                        strip_root: true,
                        ..ctx
                    },
                });
            }
            ExtendsTarget::Plugin { data, file_path } => {
                let match_base_path = file_path
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| ctx.match_base_path.clone());
                self.queue.push_front(Task::Data {
                    data: Box::new(data),
                    ctx: NormalizeCtx {
                        file_path: file_path.unwrap_or_default(),
                        match_base_path,
                        name: child_name,
                        strip_root: true,
                        ..ctx
                    },
                });
            }
            ExtendsTarget::File { path } => {
                let raw = self.factory.load_raw_config(&path).map_err(|e| {
                    LintrcError::extend_missing(
                        request,
                        importer.display().to_string(),
                        e.to_string(),
                    )
                })?;
                let child_ctx = NormalizeCtx {
                    match_base_path: path
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| ctx.match_base_path.clone()),
                    file_path: path,
                    name: child_name,
                    strip_root: true,
                    ..ctx
                };
                let tasks = tasks_for_raw(raw, &child_ctx);
                self.push_front_in_order(tasks);
            }
        }
        Ok(())
    }
}

fn tasks_for_raw(raw: RawConfig, ctx: &NormalizeCtx) -> Vec<Task> {
    match raw {
        RawConfig::Object(data) => vec![Task::Data {
            data,
            ctx: ctx.clone(),
        }],
        RawConfig::Fragments(fragments) => fragments
            .into_iter()
            .enumerate()
            .map(|(index, fragment)| {
                let child_ctx = NormalizeCtx {
                    name: format!("{}[{index}]", ctx.name),
                    ..ctx.clone()
                };
                match fragment {
                    RawFragment::Extends(request) => Task::Extend {
                        request,
                        ctx: child_ctx,
                    },
                    RawFragment::Data(data) => Task::Data {
                        data,
                        ctx: child_ctx,
                    },
                }
            })
            .collect(),
    }
}

impl Iterator for ElementStream<'_> {
    type Item = Result<ConfigElement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        loop {
            let task = self.queue.pop_front()?;
            match self.step(task) {
                Ok(Some(element)) => return Some(Ok(element)),
                Ok(None) => continue,
                Err(e) => {
                    self.fused = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
