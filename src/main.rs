fn main() -> anyhow::Result<()> {
    let command_line_interface = arlington_check::cli::CommandLineInterface::load();
    command_line_interface.run()
}
