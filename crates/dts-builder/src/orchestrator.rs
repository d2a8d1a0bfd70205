//! Drives the bundle pipeline and aggregates per-bundle outcomes
//!
//! Each bundle runs `discover -> concatenate -> optimize -> [wrap] -> compact
//! -> ensure destination -> [link externals] -> write` on its own. Bundles are
//! processed in parallel and a failing bundle never stops its siblings.
//! Everything this module says at info level or above goes through
//! [`Progress`], so `Options::verbose = false` keeps it silent; skips and
//! failures are still available from the [`GenerationReport`].

use std::path::PathBuf;

use indexmap::IndexSet;
use log::debug;
use rayon::prelude::*;

use crate::{
    compactor::compact_lines,
    config::{BundleDescriptor, Options},
    error::{BundleError, Result},
    externals::{self, LinkedExternal},
    fs::{BundleFs, LocalFs},
    logging::Progress,
    optimizer::optimize_imports,
    progress,
    wrapper::wrap_module,
};

/// Final text of one bundle and where it belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
    pub text: String,
    pub dest_file: PathBuf,
    pub externals: Vec<LinkedExternal>,
}

#[derive(Debug)]
pub enum BundleStatus {
    Written { path: PathBuf },
    /// No declaration files were found, nothing was written
    Skipped,
    Failed(BundleError),
}

#[derive(Debug)]
pub struct BundleOutcome {
    pub name: String,
    pub status: BundleStatus,
}

/// Outcomes of one run, in the order the bundles were given
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub outcomes: Vec<BundleOutcome>,
}

impl GenerationReport {
    /// Names of the bundles that were written
    pub fn written(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BundleStatus::Written { .. }))
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, BundleStatus::Skipped))
            .map(|o| o.name.as_str())
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &BundleError)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                BundleStatus::Failed(err) => Some((o.name.as_str(), err)),
                _ => None,
            })
            .collect()
    }

    /// True when no bundle failed; skipped bundles do not count as failures
    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }
}

#[derive(Debug)]
pub struct Bundler<F = LocalFs> {
    fs: F,
    progress: Progress,
}

impl Bundler<LocalFs> {
    pub fn local(options: Options) -> Self {
        Self::new(LocalFs, options)
    }
}

impl<F: BundleFs> Bundler<F> {
    pub fn new(fs: F, options: Options) -> Self {
        Self {
            fs,
            progress: Progress::new(options.verbose),
        }
    }

    /// Build and write every bundle.
    ///
    /// Returns `Err` only for problems with the call as a whole, such as two
    /// bundles writing the same file. Per-bundle failures are in the report.
    pub fn generate(&self, bundles: &[BundleDescriptor]) -> Result<GenerationReport> {
        progress!(
            self.progress,
            "Generating definition for {} bundle(s)...",
            bundles.len()
        );
        if bundles.is_empty() {
            progress!(self.progress, "Nothing to do");
            return Ok(GenerationReport::default());
        }
        check_destinations(bundles)?;

        let outcomes = bundles
            .par_iter()
            .map(|bundle| self.run(bundle))
            .collect();
        Ok(GenerationReport { outcomes })
    }

    fn run(&self, bundle: &BundleDescriptor) -> BundleOutcome {
        let status = match self.build(bundle) {
            Ok(path) => {
                progress!(self.progress, "'{}' bundle is ready", bundle.name);
                BundleStatus::Written { path }
            }
            Err(BundleError::EmptySource { dir }) => {
                progress!(
                    self.progress,
                    "No files were found in bundle '{}' under {}",
                    bundle.name,
                    dir.display()
                );
                BundleStatus::Skipped
            }
            Err(err) => {
                progress!(self.progress, "Bundle '{}' failed: {err}", bundle.name);
                BundleStatus::Failed(err)
            }
        };
        BundleOutcome {
            name: bundle.name.clone(),
            status,
        }
    }

    /// Produce the bundle text without writing it or copying externals
    pub fn render(&self, bundle: &BundleDescriptor) -> Result<BundleOutput> {
        bundle.validate()?;
        progress!(self.progress, "> Generating bundle {}", bundle.name);

        let matcher = bundle.matcher()?;
        progress!(
            self.progress,
            " + Gathering definitions from {}",
            bundle.source_dir.display()
        );
        let files = self.fs.discover(&bundle.source_dir, &matcher)?;
        if files.is_empty() {
            return Err(BundleError::EmptySource {
                dir: bundle.source_dir.clone(),
            });
        }
        progress!(self.progress, "   + Found {} definition file(s)", files.len());

        let corpus = self.concatenate(&files)?;
        progress!(
            self.progress,
            " + Concatenated {} characters",
            corpus.chars().count()
        );

        progress!(self.progress, " + Optimizing imports");
        let mut text = optimize_imports(&corpus)?;
        if bundle.wrap {
            progress!(self.progress, " + Wrapping with module");
            text = wrap_module(&text, bundle);
        }
        text = compact_lines(&text);

        let linked = externals::plan_externals(bundle)?;
        for link in &linked {
            progress!(self.progress, " * Referencing external: {}", link.file_name);
        }
        text = externals::prepend_references(&linked, &text);

        Ok(BundleOutput {
            text,
            dest_file: bundle.dest_file(),
            externals: linked,
        })
    }

    /// Render the bundle, copy its externals and write it to disk
    pub fn build(&self, bundle: &BundleDescriptor) -> Result<PathBuf> {
        let output = self.render(bundle)?;

        self.fs.ensure_dir(&bundle.dest_dir)?;
        if !bundle.externals.is_empty() {
            progress!(self.progress, " + Adding external definition files");
            externals::link_externals(bundle, &self.fs)?;
        }

        progress!(self.progress, " +-> Saving {}", output.dest_file.display());
        self.fs.write(&output.dest_file, &output.text)?;
        Ok(output.dest_file)
    }

    fn concatenate(&self, files: &[PathBuf]) -> Result<String> {
        let contents = files
            .iter()
            .map(|file| {
                debug!("Reading {}", file.display());
                self.fs
                    .read_to_string(file)
                    .map(|text| text.trim_start_matches('\u{feff}').replace("\r\n", "\n"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(contents.join("\n"))
    }
}

/// Reject runs in which two valid bundles would write the same file
fn check_destinations(bundles: &[BundleDescriptor]) -> Result<()> {
    let mut seen = IndexSet::new();
    for bundle in bundles.iter().filter(|b| b.validate().is_ok()) {
        let dest = bundle.dest_file();
        if !seen.insert(dest.clone()) {
            return Err(BundleError::invalid(format!(
                "more than one bundle writes {}",
                dest.display()
            )));
        }
    }
    Ok(())
}

/// Build and write `bundles` on the local filesystem
pub fn generate_bundles(
    bundles: &[BundleDescriptor],
    options: Options,
) -> Result<GenerationReport> {
    Bundler::local(options).generate(bundles)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        path::Path,
        sync::Mutex,
    };

    use log::{Level, LevelFilter, Log, Metadata, Record};
    use once_cell::sync::Lazy;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::discovery::FileMatcher;

    /// In-memory filesystem recording every write and copy
    #[derive(Debug, Default)]
    struct MemoryFs {
        files: Mutex<BTreeMap<PathBuf, String>>,
    }

    impl MemoryFs {
        fn with_files(files: &[(&str, &str)]) -> Self {
            let fs = Self::default();
            {
                let mut map = fs.files.lock().expect("lock");
                for (path, text) in files {
                    map.insert(PathBuf::from(path), (*text).to_owned());
                }
            }
            fs
        }

        fn get(&self, path: &str) -> Option<String> {
            self.files
                .lock()
                .expect("lock")
                .get(Path::new(path))
                .cloned()
        }
    }

    impl BundleFs for MemoryFs {
        fn discover(&self, root: &Path, matcher: &FileMatcher) -> Result<Vec<PathBuf>> {
            Ok(self
                .files
                .lock()
                .expect("lock")
                .keys()
                .filter(|path| path.starts_with(root) && matcher.is_match(path))
                .cloned()
                .collect())
        }

        fn read_to_string(&self, path: &Path) -> Result<String> {
            self.files
                .lock()
                .expect("lock")
                .get(path)
                .cloned()
                .ok_or_else(|| {
                    BundleError::io("read", path, std::io::ErrorKind::NotFound.into())
                })
        }

        fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
            let text = self.read_to_string(from)?;
            let len = text.len() as u64;
            self.files
                .lock()
                .expect("lock")
                .insert(to.to_path_buf(), text);
            Ok(len)
        }

        fn ensure_dir(&self, _dir: &Path) -> Result<()> {
            Ok(())
        }

        fn write(&self, path: &Path, text: &str) -> Result<()> {
            self.files
                .lock()
                .expect("lock")
                .insert(path.to_path_buf(), text.to_owned());
            Ok(())
        }
    }

    fn quiet() -> Options {
        Options { verbose: false }
    }

    /// Process-wide logger keeping every record at info level or above
    #[derive(Debug, Default)]
    struct CapturedLog {
        records: Mutex<Vec<String>>,
    }

    impl Log for CapturedLog {
        fn enabled(&self, metadata: &Metadata<'_>) -> bool {
            metadata.level() <= Level::Info
        }

        fn log(&self, record: &Record<'_>) {
            if self.enabled(record.metadata()) {
                self.records
                    .lock()
                    .expect("lock")
                    .push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED: Lazy<CapturedLog> = Lazy::new(CapturedLog::default);

    fn captured_mentioning(needle: &str) -> Vec<String> {
        let _ = log::set_logger(&*CAPTURED);
        log::set_max_level(LevelFilter::Trace);
        CAPTURED
            .records
            .lock()
            .expect("lock")
            .iter()
            .filter(|record| record.contains(needle))
            .cloned()
            .collect()
    }

    #[test]
    fn test_empty_call_is_a_no_op() {
        let bundler = Bundler::new(MemoryFs::default(), quiet());
        let report = bundler.generate(&[]).expect("generate");
        assert!(report.outcomes.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn test_render_wraps_and_hoists_imports() {
        let fs = MemoryFs::with_files(&[
            (
                "/src/a.d.ts",
                "import { B } from './b';\nimport B = Lib.B;\nexport declare class A extends B {}\n",
            ),
            ("/src/b.d.ts", "import B = Lib.B;\nexport declare class B {}\n"),
        ]);
        let bundle = BundleDescriptor {
            alias: Some("L".to_owned()),
            ..BundleDescriptor::new("my lib", "/src".into(), "/out".into())
        };
        let output = Bundler::new(fs, quiet()).render(&bundle).expect("render");

        assert_eq!(output.dest_file, PathBuf::from("/out/my-lib.d.ts"));
        assert_eq!(
            output.text,
            [
                "import L = myLib;",
                "",
                "declare module 'myLib' {",
                "  export = myLib;",
                "}",
                "",
                "declare namespace myLib {",
                "  import B = Lib.B;",
                "",
                "  export class A extends B {}",
                "",
                "  export class B {}",
                "",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_failure_does_not_abort_siblings() {
        let fs = MemoryFs::with_files(&[
            ("/good/a.d.ts", "export declare const a: number;\n"),
            ("/bad/b.d.ts", "export import Broken = X.Y;\n"),
        ]);
        let bundles = [
            BundleDescriptor::new("bad", "/bad".into(), "/out".into()),
            BundleDescriptor::new("empty", "/nothing".into(), "/out".into()),
            BundleDescriptor::new("good", "/good".into(), "/out".into()),
        ];
        let bundler = Bundler::new(fs, quiet());
        let report = bundler.generate(&bundles).expect("generate");

        assert_eq!(report.written(), vec!["good"]);
        assert_eq!(report.skipped(), vec!["empty"]);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad");
        assert!(matches!(
            failures[0].1,
            BundleError::UnhandledImport { .. }
        ));
        assert!(!report.is_success());
        assert!(bundler.fs.get("/out/good.d.ts").is_some());
        assert!(bundler.fs.get("/out/bad.d.ts").is_none());
        assert!(bundler.fs.get("/out/empty.d.ts").is_none());
    }

    #[test]
    fn test_quiet_bundler_logs_nothing_for_skips_and_failures() {
        captured_mentioning("");
        let fs = MemoryFs::with_files(&[("/hushed-bad/b.d.ts", "export import Broken = X.Y;\n")]);
        let bundles = [
            BundleDescriptor::new("hushed-bad", "/hushed-bad".into(), "/out".into()),
            BundleDescriptor::new("hushed-empty", "/hushed-empty".into(), "/out".into()),
        ];
        let report = Bundler::new(fs, quiet()).generate(&bundles).expect("generate");

        assert_eq!(report.skipped(), vec!["hushed-empty"]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(captured_mentioning("hushed-"), Vec::<String>::new());
    }

    #[test]
    fn test_verbose_bundler_reports_skips() {
        captured_mentioning("");
        let bundles = [BundleDescriptor::new(
            "chatty-empty",
            "/chatty-empty".into(),
            "/out".into(),
        )];
        Bundler::new(MemoryFs::default(), Options { verbose: true })
            .generate(&bundles)
            .expect("generate");

        assert!(
            captured_mentioning("chatty-empty")
                .iter()
                .any(|record| record.starts_with("No files were found"))
        );
    }

    #[test]
    fn test_crlf_sources_render_with_unix_line_endings() {
        let fs = MemoryFs::with_files(&[(
            "/src/a.d.ts",
            "import { X } from './x';\r\nimport B = Lib.B;\r\nexport declare class A extends B {}\r\nexport default A;\r\n",
        )]);
        let bundle = BundleDescriptor {
            wrap: false,
            ..BundleDescriptor::new("lib", "/src".into(), "/out".into())
        };
        let output = Bundler::new(fs, quiet()).render(&bundle).expect("render");
        assert_eq!(
            output.text,
            "import B = Lib.B;\n\nexport declare class A extends B {}\n"
        );
    }

    #[test]
    fn test_duplicate_destinations_rejected_up_front() {
        let fs = MemoryFs::with_files(&[("/src/a.d.ts", "export declare const a: 1;")]);
        let bundles = [
            BundleDescriptor::new("My Lib", "/src".into(), "/out".into()),
            BundleDescriptor::new("my-lib", "/src".into(), "/out".into()),
        ];
        let bundler = Bundler::new(fs, quiet());
        assert!(matches!(
            bundler.generate(&bundles),
            Err(BundleError::InvalidInput(_))
        ));
        assert!(bundler.fs.get("/out/my-lib.d.ts").is_none());
    }

    #[test]
    fn test_invalid_descriptor_fails_only_that_bundle() {
        let fs = MemoryFs::with_files(&[("/src/a.d.ts", "export declare const a: 1;")]);
        let bundles = [
            BundleDescriptor::new("", "/src".into(), "/out".into()),
            BundleDescriptor::new("ok", "/src".into(), "/out".into()),
        ];
        let report = Bundler::new(fs, quiet()).generate(&bundles).expect("generate");
        assert_eq!(report.written(), vec!["ok"]);
        assert!(matches!(
            report.failures()[0].1,
            BundleError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_externals_copied_and_referenced() {
        let fs = MemoryFs::with_files(&[
            ("/src/a.d.ts", "export declare const a: 1;"),
            ("/typings/globals.d.ts", "declare var VERSION: string;"),
        ]);
        let bundle = BundleDescriptor {
            externals: vec![PathBuf::from("/typings/globals.d.ts")],
            wrap: false,
            ..BundleDescriptor::new("lib", "/src".into(), "/out".into())
        };
        let bundler = Bundler::new(fs, quiet());
        let path = bundler.build(&bundle).expect("build");

        assert_eq!(path, PathBuf::from("/out/lib.d.ts"));
        assert_eq!(
            bundler.fs.get("/out/lib.d.ts").as_deref(),
            Some("/// <reference path=\"globals.d.ts\" />\n\nexport declare const a: 1;")
        );
        assert_eq!(
            bundler.fs.get("/out/globals.d.ts").as_deref(),
            Some("declare var VERSION: string;")
        );
    }
}
