use datatest_stable::Utf8Path;
use nscheme::{parse_source, Lexer, Session};

#[derive(thiserror::Error, Debug)]
#[error("error(s) occured in datatest at {0}")]
pub struct DatatestError(Box<Utf8Path>);

/// A test file is three sections separated by `---` lines:
/// expected errors, expected output, then the source under test.
///
/// Lines starting with `;;` in the first two sections are comments. A single
/// `;` is not enough since module dumps start with `; ModuleID`. Comments are
/// kept, at the same position within their section, when the file is
/// rewritten with `DATATEST_EXPECT` set.
// from https://matklad.github.io/2021/05/31/how-to-test.html
#[derive(Debug, Default)]
struct Datatest<'a> {
    errors: Vec<&'a str>,
    output: Vec<&'a str>,
    source: String,
    error_comments: Vec<(usize, &'a str)>,
    output_comments: Vec<(usize, &'a str)>,
}

#[derive(PartialEq, Eq, Debug, Default, Clone, Copy)]
enum Section {
    #[default]
    Errors,
    Output,
    Source,
}

impl<'a> Datatest<'a> {
    fn read(contents: &'a str) -> Self {
        let mut test = Self::default();
        let mut source_lines = vec![];
        let mut section = Section::default();

        for line in contents.lines() {
            if section != Section::Source && line.trim_end() == "---" {
                section = match section {
                    Section::Errors => Section::Output,
                    _ => Section::Source,
                };
                continue;
            }
            let is_comment = line.trim_start().starts_with(";;");
            match section {
                Section::Errors if is_comment => {
                    test.error_comments.push((test.errors.len(), line))
                }
                Section::Errors => test.errors.push(line),
                Section::Output if is_comment => {
                    test.output_comments.push((test.output.len(), line))
                }
                Section::Output => test.output.push(line),
                Section::Source => source_lines.push(line),
            }
        }

        test.source = source_lines.join("\n");
        test
    }

    fn expected_errors(&self) -> Vec<&'a str> {
        self.errors
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect()
    }

    fn expected_output(&self) -> String {
        self.output.join("\n").trim().to_string()
    }

    /// The file contents with `errors` and `output` as the new expectations.
    fn stitch(&self, errors: &[String], output: &str) -> String {
        fn interleave<'s>(
            lines: impl IntoIterator<Item = &'s str>,
            comments: &[(usize, &'s str)],
        ) -> Vec<&'s str> {
            let mut comments = comments.iter().peekable();
            let mut out = vec![];
            for (idx, line) in lines.into_iter().enumerate() {
                while let Some((_, comment)) = comments.next_if(|(at, _)| *at <= idx) {
                    out.push(*comment);
                }
                out.push(line);
            }
            out.extend(comments.map(|(_, comment)| *comment));
            out
        }

        let mut lines = interleave(errors.iter().map(String::as_str), &self.error_comments);
        lines.push("---");
        lines.extend(interleave(output.lines(), &self.output_comments));
        lines.push("---");
        lines.push(&self.source);

        let mut contents = lines.join("\n");
        contents.push('\n');
        contents
    }
}

fn check_datatest(
    path: &Utf8Path,
    test: &Datatest,
    errors: Vec<String>,
    output: String,
) -> datatest_stable::Result<()> {
    if std::env::var("DATATEST_EXPECT").is_ok() {
        std::fs::write(path, test.stitch(&errors, &output))?;
        return Ok(());
    }

    let mut failed = false;
    let expected_output = test.expected_output();
    if output.trim() != expected_output {
        println!(
            "error in {path}: mismatched output\n\nGot:\n{}\n\nExpected:\n{}",
            output.trim(),
            expected_output
        );
        failed = true;
    }

    let expected_errors = test.expected_errors();
    if expected_errors.len() != errors.len() {
        println!(
            "error in {path}: expected {} errors, found {}",
            expected_errors.len(),
            errors.len()
        );
        failed = true;
    } else if let Some((expected, got)) = expected_errors
        .iter()
        .zip(errors.iter())
        .find(|(expected, got)| **expected != got.trim())
    {
        println!("error in {path}: error mismatch\n\nGot:\n{got}\n\nExpected:\n{expected}");
        failed = true;
    }

    if failed {
        Err(DatatestError(Box::from(path)))?
    } else {
        Ok(())
    }
}

fn lexer_test(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let test = Datatest::read(&contents);

    let mut lexer = Lexer::new(&test.source);
    let tokens: Vec<String> = lexer
        .tokens()
        .map_while(Result::ok)
        .map(|token| format!("[{:?}] {} {:?}", token.span, token.kind, token.lexeme))
        .collect();
    let errors = lexer
        .error()
        .map(|err| vec![format!("[{:?}] {err}", err.span())])
        .unwrap_or_default();

    check_datatest(path, &test, errors, tokens.join("\n"))
}

fn parser_test(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let test = Datatest::read(&contents);

    let (errors, output) = match parse_source(&test.source) {
        Ok(exprs) => (
            vec![],
            exprs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        Err(err) => (vec![format!("{err:?}")], String::new()),
    };

    check_datatest(path, &test, errors, output)
}

fn ir_test(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let test = Datatest::read(&contents);

    let mut session = Session::new("test");
    let errors = match session.compile(&test.source) {
        Ok(_) => vec![],
        Err(err) => vec![err.to_string()],
    };

    check_datatest(path, &test, errors, session.module().to_string())
}

datatest_stable::harness! {
    lexer_test, "test_data", r"^.*\.lxd",
    parser_test, "test_data", r"^.*\.psd",
    ir_test, "test_data", r"^.*\.ird",
}
