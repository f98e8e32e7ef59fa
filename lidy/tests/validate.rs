// Copyright lidy developers. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod validate_tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use lidy::commands::{
        BYPASS_MISSING_RULE, DOCUMENT, ENTRY, GRAMMAR, MAX_DEPTH, OUTPUT_FORMAT, VALIDATE,
    };
    use lidy::utils::reader::ReadBuffer::Stdin;
    use lidy::utils::reader::Reader;
    use lidy::utils::writer::{WriteBuffer::Vec as WBVec, Writer};

    use crate::utils::{get_path_for_resource_file, CommandTestRunner, StatusCode};

    #[derive(Default)]
    struct ValidateTestRunner<'args> {
        grammar: Option<&'args str>,
        documents: Vec<&'args str>,
        entry: Option<&'args str>,
        output_format: Option<&'args str>,
        bypass_missing_rule: bool,
        max_depth: Option<usize>,
    }

    impl<'args> ValidateTestRunner<'args> {
        fn grammar(&'args mut self, arg: &'args str) -> &'args mut ValidateTestRunner {
            self.grammar = Some(arg);
            self
        }

        fn documents(&'args mut self, args: Vec<&'args str>) -> &'args mut ValidateTestRunner {
            self.documents = args;
            self
        }

        fn entry(&'args mut self, arg: &'args str) -> &'args mut ValidateTestRunner {
            self.entry = Some(arg);
            self
        }

        fn output_format(&'args mut self, arg: &'args str) -> &'args mut ValidateTestRunner {
            self.output_format = Some(arg);
            self
        }

        fn bypass_missing_rule(&'args mut self) -> &'args mut ValidateTestRunner {
            self.bypass_missing_rule = true;
            self
        }

        fn max_depth(&'args mut self, arg: usize) -> &'args mut ValidateTestRunner {
            self.max_depth = Some(arg);
            self
        }
    }

    impl<'args> CommandTestRunner for ValidateTestRunner<'args> {
        fn build_args(&self) -> Vec<String> {
            let mut args = vec![String::from(VALIDATE)];

            if let Some(grammar) = self.grammar {
                args.push(format!("-{}", GRAMMAR.1));
                args.push(get_path_for_resource_file(grammar));
            }

            for document in &self.documents {
                args.push(format!("-{}", DOCUMENT.1));
                args.push(get_path_for_resource_file(document));
            }

            if let Some(entry) = self.entry {
                args.push(format!("--{}", ENTRY.0));
                args.push(entry.to_string());
            }

            if let Some(output_format) = self.output_format {
                args.push(format!("-{}", OUTPUT_FORMAT.1));
                args.push(output_format.to_string());
            }

            if self.bypass_missing_rule {
                args.push(format!("-{}", BYPASS_MISSING_RULE.1));
            }

            if let Some(max_depth) = self.max_depth {
                args.push(format!("--{}", MAX_DEPTH));
                args.push(max_depth.to_string());
            }

            args
        }
    }

    fn stdin() -> Reader {
        Reader::new(Stdin(std::io::stdin()))
    }

    #[rstest]
    #[case(vec!["documents/valid/alice.yaml"], StatusCode::SUCCESS)]
    #[case(vec!["documents/valid/bob.json"], StatusCode::SUCCESS)]
    #[case(vec!["documents/valid"], StatusCode::SUCCESS)]
    #[case(vec!["documents/invalid/carol.yaml"], StatusCode::VALIDATION_ERROR)]
    #[case(vec!["documents/valid", "documents/invalid"], StatusCode::VALIDATION_ERROR)]
    #[case(vec!["documents/broken/broken.yaml"], StatusCode::ERROR)]
    #[case(vec!["documents/invalid", "documents/broken"], StatusCode::ERROR)]
    #[case(vec!["documents/missing.yaml"], StatusCode::ERROR)]
    fn status_codes(#[case] documents: Vec<&str>, #[case] expected: i32) {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(documents)
            .run(&mut writer, &mut stdin());

        assert_eq!(expected, status_code);
    }

    #[test]
    fn console_output_locates_every_problem() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(vec!["documents/invalid/carol.yaml"])
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::VALIDATION_ERROR, status_code);

        let output = writer.stripped().unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(3, lines.len());
        assert!(lines[0].ends_with("carol.yaml:2:6: error[WrongType]: expected an int but found a string"));
        assert!(lines[1].ends_with("carol.yaml:3:1: error[UnknownKey]: unknown key `nickname`, expected one of name, age, email, tags, address"));
        assert!(lines[2].ends_with("carol.yaml Status = FAIL"));
    }

    #[test]
    fn directories_are_walked_in_order() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(vec!["documents/valid"])
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::SUCCESS, status_code);

        let output = writer.stripped().unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(2, lines.len());
        assert!(lines[0].ends_with("alice.yaml Status = PASS"));
        assert!(lines[1].ends_with("bob.json Status = PASS"));
    }

    #[test]
    fn json_output() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(vec!["documents/invalid/carol.yaml"])
            .output_format("json")
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::VALIDATION_ERROR, status_code);

        let output = writer.stripped().unwrap();
        let records: serde_json::Value = serde_json::from_str(&output).unwrap();
        let record = &records[0];
        assert_eq!("FAIL", record["status"]);
        assert_eq!("main", record["entry"]);
        assert_eq!("WrongType", record["errors"][0]["code"]);
        assert_eq!(2, record["errors"][0]["line"]);
        assert_eq!(6, record["errors"][0]["column"]);
        assert_eq!("UnknownKey", record["errors"][1]["code"]);
        assert!(record["warnings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn yaml_output() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(vec!["documents/valid/alice.yaml"])
            .output_format("yaml")
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::SUCCESS, status_code);

        let output = writer.stripped().unwrap();
        let records: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert_eq!(Some("PASS"), records[0]["status"].as_str());
    }

    #[test]
    fn entry_rule_is_selectable() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(vec!["documents/valid/alice.yaml"])
            .entry("place")
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::VALIDATION_ERROR, status_code);
    }

    #[test]
    fn unknown_entry_rule() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .documents(vec!["documents/valid/alice.yaml"])
            .entry("nowhere")
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::ERROR, status_code);
        let err = writer.err_to_stripped().unwrap();
        assert!(err.contains("No rule named `nowhere` to start validation from"));
    }

    #[test]
    fn grammar_errors_are_located() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/dangling_reference.yaml")
            .documents(vec!["documents/valid/alice.yaml"])
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::ERROR, status_code);
        let err = writer.err_to_stripped().unwrap();
        assert!(err.contains("dangling_reference.yaml:3:11: error: no rule named `nowhere`"));
    }

    #[test]
    fn bypass_missing_rule() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/dangling_reference.yaml")
            .documents(vec!["documents/invalid/carol.yaml"])
            .bypass_missing_rule()
            .run(&mut writer, &mut stdin());
        assert_eq!(StatusCode::VALIDATION_ERROR, status_code);
        let output = writer.stripped().unwrap();
        assert!(output.contains("error[UnknownKey]: unknown key `age`"));
    }

    #[test]
    fn document_from_stdin() {
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let mut reader = Reader::from_text(indoc! {r#"
            name: dave
            age: 41
            tags: [yes]
        "#});
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .max_depth(16)
            .run(&mut writer, &mut reader);
        assert_eq!(StatusCode::SUCCESS, status_code);
        assert_eq!("<stdin> Status = PASS\n", writer.stripped().unwrap());
    }

    #[test]
    fn deep_documents_fail_without_aborting() {
        let document = format!("{}{}", "[".repeat(900), "]".repeat(900));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .entry("any")
            .run(&mut writer, &mut Reader::from_text(&document));
        assert_eq!(StatusCode::VALIDATION_ERROR, status_code);
        assert!(writer.stripped().unwrap().contains("error[RecursionLimit]"));

        let document = format!("{}{}", "[".repeat(5000), "]".repeat(5000));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ValidateTestRunner::default()
            .grammar("grammars/person.yaml")
            .entry("any")
            .run(&mut writer, &mut Reader::from_text(&document));
        assert_eq!(StatusCode::ERROR, status_code);
        assert!(writer.err_to_stripped().unwrap().contains("nested deeper than"));
    }
}
