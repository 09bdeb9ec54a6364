#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::codegen::{generate, GenResult, IdentFactory, C_EPILOGUE, C_PROLOGUE};
    use crate::error::Severity;
    use crate::lexer::tokenize;
    use crate::parser::ast::{
        ArithForCommand, CaseCommand, Command, CoprocCommand, ForCommand, FunctionDef,
        SimpleCommand, Word,
    };
    use crate::parser::parse;

    /// Run lexer → parser → generator, asserting the front end is clean.
    fn gen(source: &str) -> GenResult {
        let lexed = tokenize(source);
        assert!(lexed.errors.is_empty(), "lexer errors: {:?}", lexed.errors);
        let parsed = parse(&lexed.tokens);
        assert!(
            parsed.errors.is_empty(),
            "parser errors: {:?}",
            parsed.errors
        );
        generate(&parsed.commands).expect("generation failed")
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    fn assert_braces_balanced(source: &str) {
        assert_eq!(
            count(source, "{"),
            count(source, "}"),
            "unbalanced braces in:\n{source}"
        );
    }

    #[test]
    fn empty_input_is_prologue_and_epilogue() {
        let result = generate(&[]).unwrap();
        assert_eq!(result.c_source, format!("{C_PROLOGUE}{C_EPILOGUE}"));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn prologue_declares_status_and_runtime_header() {
        let result = gen("echo hi\n");
        assert!(result
            .c_source
            .starts_with("/* This file generated by bashc */\n"));
        assert!(result.c_source.contains("#include \"libbashc/libbashc.h\""));
        assert!(result.c_source.contains("\tint G_status;\n"));
        assert!(result.c_source.contains("\tG_status = 0;\n"));
        assert!(result.c_source.ends_with("\treturn G_status;\n}\n"));
    }

    #[test]
    fn echo_spawns_system_binary() {
        let result = gen("echo hi\n");
        let out = &result.c_source;
        assert!(out.contains("static char* const argv2[] = { \"echo\", \"hi\", NULL, };"));
        assert!(out.contains("struct rtioctx* rtioc0 = NULL;"));
        assert!(out.contains("pid_t retstatus1;"));
        assert!(out.contains("retstatus1 = forkexec_argv(argv2,rtioc0,0);"));
        assert!(out.contains("G_status = retstatus1;"));
        assert!(result.diagnostics.is_empty());
        assert_braces_balanced(out);
    }

    #[test]
    fn argv_strings_are_encoded() {
        let result = gen("echo 'a b' 'say \"hi\"'\n");
        assert!(result
            .c_source
            .contains("{ \"echo\", \"a b\", \"say \\\"hi\\\"\", NULL, };"));
    }

    #[test]
    fn and_and_guards_right_hand_side() {
        let result = gen("false && echo unreached\n");
        let out = &result.c_source;
        assert!(out.contains("G_status = 1;"));
        assert!(out.contains("if (!G_status) {"));
        assert_eq!(count(out, "forkexec_argv"), 1);
        let guard = out.find("if (!G_status) {").unwrap();
        let call = out.find("forkexec_argv").unwrap();
        assert!(call > guard, "the echo must be inside the guard");
        assert_braces_balanced(out);
    }

    #[test]
    fn or_or_guards_on_failure() {
        let result = gen("false || echo rescued\n");
        let out = &result.c_source;
        assert!(out.contains("if (G_status) {"));
        assert_eq!(count(out, "forkexec_argv"), 1);
    }

    #[test]
    fn sequence_emits_both_sides_unguarded() {
        let result = gen("echo a; echo b\n");
        let out = &result.c_source;
        assert_eq!(count(out, "forkexec_argv"), 2);
        assert!(!out.contains("if (!G_status)"));
        assert!(!out.contains("if (G_status)"));
    }

    #[test]
    fn pipe_backgrounds_writer_and_waits_after_reader() {
        let result = gen("ls | wc -l\n");
        let out = &result.c_source;
        assert!(out.contains("int pipe0[2];"));
        assert!(out.contains("pid_t bgpid1;"));
        assert!(out.contains("if (!pipe(pipe0)) {"));
        // Writer: stdout onto the pipe, stray read end closed, backgrounded,
        // pid captured for the later waitpid.
        assert!(out.contains("rtioc2->fds[0][0] = pipe0[1];"));
        assert!(out.contains("rtioc2->fds[0][1] = 1;"));
        assert!(out.contains("rtioc2->fds[1][0] = pipe0[0];"));
        assert!(out.contains("rtioc2->fds[1][1] = IO_CLOSE_FD;"));
        assert!(out.contains("bgpid1 = forkexec_argv(argv3,rtioc2,0|FE_BACKGROUND);"));
        // Reader: stdin from the pipe, run in the foreground.
        assert!(out.contains("rtioc4->fds[0][0] = pipe0[0];"));
        assert!(out.contains("rtioc4->fds[0][1] = 0;"));
        assert!(out.contains("retstatus5 = forkexec_argv(argv6,rtioc4,0);"));
        assert!(out.contains("G_status = retstatus5;"));
        // Parent closes both ends and reaps the writer.
        assert!(out.contains("close(pipe0[1]);"));
        assert!(out.contains("close(pipe0[0]);"));
        assert!(out.contains("waitpid(bgpid1,NULL,0);"));
        assert!(out.contains("perror(\"pipe\");"));
        assert_braces_balanced(out);
    }

    #[test]
    fn pipe_materialized_records_are_freed() {
        let result = gen("ls | wc -l\n");
        let out = &result.c_source;
        assert!(out.contains("free(rtioc2);"));
        assert!(out.contains("free(rtioc4);"));
    }

    #[test]
    fn background_command_is_not_waited_on() {
        let result = gen("sleep 1 &\n");
        let out = &result.c_source;
        assert!(out.contains("forkexec_argv(argv1,rtioc0,0|FE_BACKGROUND);"));
        assert!(out.contains("G_status = 0;"));
        assert!(!out.contains("retstatus"));
        assert!(!out.contains("waitpid"));
    }

    #[test]
    fn invert_return_negates_the_call() {
        let result = gen("! ls\n");
        assert!(result
            .c_source
            .contains("retstatus1 = !forkexec_argv(argv2,rtioc0,0);"));
    }

    #[test]
    fn while_loop_emits_label_pair_and_saved_status() {
        let result = gen("while :; do break; done\n");
        let out = &result.c_source;
        assert!(out.contains("int whilestatus2 = 0;"));
        assert!(out.contains("whileentry0:\n"));
        // The `:` built-in inlines to a success assignment.
        assert!(out.contains("G_status = 0;"));
        // Test failure restores the saved status and leaves.
        assert!(out.contains("if (G_status) {"));
        assert!(out.contains("G_status = whilestatus2;"));
        // One goto from the exit test, one from `break`.
        assert_eq!(count(out, "goto whileexit1;"), 2);
        assert_eq!(count(out, "goto whileentry0;"), 1);
        assert!(out.contains("whilestatus2 = G_status;"));
        assert!(out.contains("whileexit1:"));
        assert!(result.diagnostics.is_empty());
        assert_braces_balanced(out);
    }

    #[test]
    fn until_loop_inverts_the_exit_test() {
        let result = gen("until false; do echo tick; done\n");
        let out = &result.c_source;
        assert!(out.contains("if (!G_status) {"));
        assert!(out.contains("goto whileexit1;"));
        assert!(out.contains("goto whileentry0;"));
    }

    #[test]
    fn continue_jumps_to_the_entry_label() {
        let result = gen("while :; do continue; done\n");
        let out = &result.c_source;
        // One from `continue`, one from the loop's own back edge.
        assert_eq!(count(out, "goto whileentry0;"), 2);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn break_two_reaches_the_outer_loop() {
        let result = gen("while :; do while :; do break 2; done; done\n");
        let out = &result.c_source;
        // Outer labels are minted first (entry 0 / exit 1), inner second
        // (entry 3 / exit 4). `break 2` must target the outer exit.
        assert_eq!(count(out, "goto whileexit1;"), 2);
        assert_eq!(count(out, "goto whileexit4;"), 1);
        assert!(result.diagnostics.is_empty());
        assert_braces_balanced(out);
    }

    #[test]
    fn if_else_brackets_both_branches_with_comments() {
        let result = gen("if false; then echo no; else echo yes; fi\n");
        let out = &result.c_source;
        for marker in ["/* if */", "/* then */", "/* else */", "/* fi */"] {
            assert!(out.contains(marker), "missing {marker}");
        }
        assert!(out.contains("G_status = 1;"));
        assert!(out.contains("if (!G_status) {"));
        assert!(out.contains("} else {"));
        assert_eq!(count(out, "forkexec_argv"), 2);
        assert_braces_balanced(out);
    }

    #[test]
    fn elif_nests_into_the_false_branch() {
        let result = gen("if false; then echo a; elif false; then echo b; else echo c; fi\n");
        let out = &result.c_source;
        assert_eq!(count(out, "/* if */"), 2);
        assert_eq!(count(out, "/* fi */"), 2);
        assert_eq!(count(out, "forkexec_argv"), 3);
        assert_braces_balanced(out);
    }

    #[test]
    fn cd_emits_inline_chdir() {
        let result = gen("cd /tmp\n");
        let out = &result.c_source;
        assert!(out.contains("if (chdir(\"/tmp\")) {"));
        assert!(out.contains("perror(\"chdir: /tmp\");"));
        assert!(out.contains("G_status = 1;"));
        assert!(out.contains("} else {"));
        assert!(out.contains("G_status = 0;"));
        assert!(!out.contains("forkexec_argv"));
        assert_braces_balanced(out);
    }

    #[test]
    fn pwd_prints_and_frees_the_buffer() {
        let result = gen("pwd\n");
        let out = &result.c_source;
        assert!(out.contains("char* cwd0;"));
        assert!(out.contains("if (!(cwd0 = get_current_dir_name())) {"));
        assert!(out.contains("perror(\"get_current_dir_name\");"));
        assert!(out.contains("printf(\"%s\\n\",cwd0);"));
        assert!(out.contains("free(cwd0);"));
        assert_braces_balanced(out);
    }

    #[test]
    fn colon_and_false_inline_status() {
        let result = gen(": ; false\n");
        let out = &result.c_source;
        assert!(out.contains("G_status = 0;"));
        assert!(out.contains("G_status = 1;"));
        assert!(!out.contains("forkexec_argv"));
    }

    #[test]
    fn unknown_builtin_is_nyi() {
        let result = gen("true\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
        assert!(result.diagnostics[0]
            .message
            .contains("NYI: compilation of true builtin"));
        assert!(!result.c_source.contains("forkexec_argv"));
        assert_braces_balanced(&result.c_source);
    }

    #[test]
    fn expansion_word_is_nyi_with_no_argv() {
        let result = gen("echo $HOME\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0]
            .message
            .contains("non-literal words (expansion, etc)"));
        assert!(!result.c_source.contains("static char* const"));
        assert!(!result.c_source.contains("forkexec_argv"));
        assert_braces_balanced(&result.c_source);
    }

    #[test]
    fn glob_word_is_nyi() {
        let result = gen("ls *.c\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("non-literal words"));
    }

    #[test]
    fn redirect_is_nyi() {
        let result = gen("echo hi > out.txt\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0]
            .message
            .contains("NYI: compilation of redirects"));
        assert!(!result.c_source.contains("forkexec_argv"));
    }

    #[test]
    fn break_outside_loop_reports_and_emits_nothing() {
        let result = gen("break\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
        assert!(result.diagnostics[0]
            .message
            .contains("'break' only meaningful inside a loop"));
        assert!(!result.c_source.contains("goto"));
        assert_braces_balanced(&result.c_source);
    }

    #[test]
    fn continue_outside_loop_reports() {
        let result = gen("continue\n");
        assert!(result.diagnostics[0]
            .message
            .contains("'continue' only meaningful inside a loop"));
    }

    #[test]
    fn break_level_beyond_depth_reports() {
        let result = gen("while :; do break 9; done\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0]
            .message
            .contains("break: 9: loop count out of range"));
        // Only the loop's own exit goto remains.
        assert_eq!(count(&result.c_source, "goto whileexit1;"), 1);
        assert_braces_balanced(&result.c_source);
    }

    #[test]
    fn break_non_numeric_level_reports() {
        let result = gen("while :; do break x; done\n");
        assert!(result.diagnostics[0]
            .message
            .contains("break: x: numeric argument required"));
    }

    #[test]
    fn break_trailing_garbage_reports() {
        let result = gen("while :; do break 1x; done\n");
        assert!(result.diagnostics[0]
            .message
            .contains("break: 1x: numeric argument required"));
    }

    #[test]
    fn break_too_many_arguments_reports() {
        let result = gen("while :; do break 1 2; done\n");
        assert!(result.diagnostics[0]
            .message
            .contains("break: too many arguments"));
    }

    #[test]
    fn cd_without_argument_is_nyi() {
        let result = gen("cd\n");
        assert!(result.diagnostics[0]
            .message
            .contains("cd with no directory argument"));
        assert!(!result.c_source.contains("chdir"));
    }

    #[test]
    fn cd_with_two_arguments_reports() {
        let result = gen("cd a b\n");
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
        assert!(result.diagnostics[0]
            .message
            .contains("cd: too many arguments"));
    }

    fn simple(words: &[&str]) -> SimpleCommand {
        SimpleCommand::from_literals(words.iter().copied())
    }

    #[test]
    fn unsupported_command_kinds_are_nyi() {
        let body = || Box::new(Command::Simple(simple(&["echo", "x"])));
        let cases: Vec<(Command, &str)> = vec![
            (
                Command::For(ForCommand {
                    variable: Word::literal("i"),
                    words: Some(vec![Word::literal("a")]),
                    body: body(),
                }),
                "for command",
            ),
            (
                Command::Case(CaseCommand {
                    subject: Word::literal("x"),
                    clauses: Vec::new(),
                }),
                "case command",
            ),
            (
                Command::Select(ForCommand {
                    variable: Word::literal("i"),
                    words: None,
                    body: body(),
                }),
                "select command",
            ),
            (
                Command::FunctionDef(FunctionDef {
                    name: Word::literal("f"),
                    body: body(),
                }),
                "function definition",
            ),
            (Command::Group(body()), "group command"),
            (
                Command::Arith(vec![Word::literal("x+1")]),
                "arithmetic command",
            ),
            (
                Command::Cond(vec![Word::literal("-f"), Word::literal("x")]),
                "conditional command",
            ),
            (
                Command::ArithFor(ArithForCommand {
                    init: vec![Word::literal("i=0")],
                    test: vec![Word::literal("i<3")],
                    step: vec![Word::literal("i++")],
                    body: body(),
                }),
                "arithmetic for command",
            ),
            (Command::Subshell(body()), "subshell"),
            (
                Command::Coproc(CoprocCommand {
                    name: None,
                    command: body(),
                }),
                "coprocess",
            ),
        ];

        for (cmd, kind) in cases {
            let result = generate(std::slice::from_ref(&cmd)).unwrap();
            assert_eq!(result.diagnostics.len(), 1, "for {kind}");
            assert!(
                result.diagnostics[0]
                    .message
                    .contains(&format!("NYI: compilation of {kind}")),
                "unexpected message {:?} for {kind}",
                result.diagnostics[0].message
            );
            // Nothing was emitted for the construct.
            assert_eq!(result.c_source, format!("{C_PROLOGUE}{C_EPILOGUE}"));
        }
    }

    #[test]
    fn nyi_constructs_do_not_break_surrounding_output() {
        let result = gen("echo before\nfor x in a b; do echo hi; done\necho after\n");
        assert_eq!(result.diagnostics.len(), 1);
        let out = &result.c_source;
        assert!(out.contains("\"before\""));
        assert!(out.contains("\"after\""));
        assert_eq!(count(out, "forkexec_argv"), 2);
        assert_braces_balanced(out);
    }

    #[test]
    fn null_command_entry_is_a_no_op() {
        // A trailing `&` leaves the connection with no right-hand command.
        let result = gen("echo hi &\n");
        assert_eq!(count(&result.c_source, "forkexec_argv"), 1);
        assert_braces_balanced(&result.c_source);
    }

    #[test]
    fn fresh_identifiers_are_never_reissued() {
        let mut idents = IdentFactory::default();
        let mut seen = HashSet::new();
        for i in 0..100 {
            let base = if i % 3 == 0 { "argv" } else { "rtioc" };
            assert!(seen.insert(idents.fresh(base)), "identifier reissued");
        }
        assert!(seen.insert(idents.fresh("")));
        assert!(seen.iter().any(|s| s.starts_with("var")));
    }

    #[test]
    fn emitted_programs_balance_braces() {
        let sources = [
            "echo hi\n",
            "false && echo a || echo b\n",
            "ls | wc -l | cat\n",
            "while :; do break; done\n",
            "until false; do continue; done\n",
            "if :; then echo a; fi\n",
            "if false; then echo a; elif :; then echo b; else echo c; fi\n",
            "cd /tmp; pwd; false; :\n",
            "echo a & echo b; ! ls\n",
            "while :; do while :; do break 2; done; done\n",
        ];
        for source in sources {
            let result = gen(source);
            assert_braces_balanced(&result.c_source);
            assert!(result.c_source.ends_with("\treturn G_status;\n}\n"));
        }
    }
}
