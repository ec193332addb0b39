#![cfg(unix)]

use plastic_shell::core::command::CommandOutput;
use plastic_shell::core::runner::Runner;
use plastic_shell::core::shell::{CommandRequest, Shell, Transport, USER_INTERACTION_NOTICE};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod common;
use common::workspace::*;

fn request(line: &str) -> CommandRequest {
    let mut words = line.split(' ');
    let verb = words.next().unwrap_or_default();
    let parameters: Vec<String> = words.map(str::to_string).collect();
    CommandRequest::new(verb, &parameters, &[])
}

#[cfg(test)]
mod shell_tests {
    use super::*;

    #[test]
    fn test_reply_is_truncated_at_the_result_line() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Shell::new(workspace.shell_config());
        assert!(shell.launch(&workspace.path));

        let reply = shell.send(&request("version"));
        assert!(reply.success);
        assert_eq!(reply.result_code, 0);
        assert_eq!(reply.output, "11.0.16.8200\n");
        assert!(reply.errors.is_empty());
        assert_eq!(shell.stats().commands, 1);
        Ok(())
    }

    #[test]
    fn test_failed_command_output_is_the_error_text() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Shell::new(workspace.shell_config());
        assert!(shell.launch(&workspace.path));

        let reply = shell.send(&request("fail"));
        assert!(!reply.success);
        assert_eq!(reply.result_code, 1);
        assert_eq!(reply.errors, "Something went wrong\n");
        assert!(reply.output.is_empty());

        // The session is still usable.
        assert!(shell.send(&request("echo still alive")).success);
        Ok(())
    }

    #[test]
    fn test_failed_command_is_reported_once() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Arc::new(Shell::new(workspace.shell_config()));
        assert!(shell.launch(&workspace.path));
        let runner = Runner::new(shell);

        let run = runner.run_lines("fail", &[], &[]);
        assert!(!run.success);
        assert!(run.lines.is_empty());
        assert_eq!(run.errors, vec!["Something went wrong".to_string()]);

        let mut output = CommandOutput::default();
        assert!(!output.absorb(run));
        assert!(output.infos.is_empty());
        assert_eq!(output.errors, vec!["Something went wrong".to_string()]);
        Ok(())
    }

    #[test]
    fn test_error_stream_stays_with_its_command() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Shell::new(workspace.shell_config());
        assert!(shell.launch(&workspace.path));

        for _ in 0..20 {
            let reply = shell.send(&request("locked A.uasset"));
            assert!(!reply.success);
            assert_eq!(reply.errors, "Error: A.uasset is locked by jane\n");

            let reply = shell.send(&request("echo next"));
            assert!(reply.success);
            assert_eq!(reply.output, "next\n");
        }
        Ok(())
    }

    #[test]
    fn test_interactive_prompt_restarts_and_notifies() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        let shell = Shell::with_notifier(workspace.shell_config(), sender);
        assert!(shell.launch(&workspace.path));

        let reply = shell.send(&request("prompt"));
        assert!(!reply.success);
        assert!(reply.errors.contains("Select your system"));
        assert_eq!(receiver.try_recv()?, USER_INTERACTION_NOTICE);

        let reply = shell.send(&request("echo after prompt"));
        assert!(reply.success);
        assert_eq!(reply.output, "after prompt\n");
        Ok(())
    }

    #[test]
    fn test_inactivity_timeout_restarts_with_partial_output() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Shell::new(workspace.shell_config());
        assert!(shell.launch(&workspace.path));

        let reply = shell.send(&request("hang"));
        assert!(!reply.success);
        assert_eq!(reply.errors, "started\n");

        assert!(shell.is_running());
        assert!(shell.send(&request("version")).success);
        Ok(())
    }

    #[test]
    fn test_stopped_process_is_relaunched_lazily() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Shell::new(workspace.shell_config());
        assert!(shell.launch(&workspace.path));

        let reply = shell.send(&request("crash"));
        assert!(!reply.success);
        assert!(reply.errors.contains("partial output"));

        let reply = shell.send(&request("whoami"));
        assert!(reply.success);
        assert_eq!(reply.output, "alice\n");
        Ok(())
    }

    #[test]
    fn test_repeated_restarts_never_wedge_the_transport() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let (sender, _receiver) = crossbeam_channel::unbounded();
        let shell = Shell::with_notifier(workspace.shell_config(), sender);
        assert!(shell.launch(&workspace.path));

        for _ in 0..3 {
            assert!(!shell.send(&request("crash")).success);
            assert!(!shell.send(&request("prompt")).success);
        }
        assert!(shell.send(&request("version")).success);
        Ok(())
    }

    #[test]
    fn test_concurrent_requests_are_serialized() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Arc::new(Shell::new(workspace.shell_config()));
        assert!(shell.launch(&workspace.path));

        let handles: Vec<_> = ["first", "second", "third"]
            .into_iter()
            .map(|name| {
                let shell = shell.clone();
                thread::spawn(move || (name, shell.send(&request(&format!("slow {name}")))))
            })
            .collect();

        for handle in handles {
            let (name, reply) = handle.join().expect("request thread panicked");
            assert!(reply.success);
            assert_eq!(reply.output, format!("{name} begins\n{name} ends\n"));
        }
        assert_eq!(shell.stats().commands, 3);
        Ok(())
    }

    #[test]
    fn test_terminate_is_idempotent() -> anyhow::Result<()> {
        let workspace = setup_test_workspace()?;
        let shell = Shell::new(workspace.shell_config());
        assert!(shell.launch(&workspace.path));
        assert!(shell.is_running());

        shell.terminate();
        assert!(!shell.is_running());
        shell.terminate();

        thread::sleep(Duration::from_millis(10));
        assert!(shell.send(&request("version")).success);
        Ok(())
    }
}
