use crate::core::{
    command_init::CommandInit,
    error::{PlasticError, Result},
    output::print_client_errors,
};

/// Send one raw command line to the shell and print its output.
pub fn execute_run(verb: String, parameters: Vec<String>) -> Result<()> {
    let context = CommandInit::initialize()?;
    let output = context.provider.runner().run_lines(&verb, &parameters, &[]);

    for line in &output.lines {
        println!("{line}");
    }
    if output.success {
        Ok(())
    } else {
        print_client_errors(&output.errors);
        Err(PlasticError::operation_failed(verb, &[]))
    }
}
