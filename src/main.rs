use std::path::PathBuf;

enum Command {
    Run(repo_gallery::RunOptions),
    Exit,
}

fn main() {
    let command = match handle_cli_flags() {
        Ok(command) => command,
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(2);
        }
    };

    let Command::Run(options) = command else {
        return;
    };

    if let Err(err) = repo_gallery::run(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> anyhow::Result<Command> {
    let mut options = repo_gallery::RunOptions::default();
    let mut print_config = false;
    let mut saw_flag = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("repo-gallery {}", repo_gallery::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "repo-gallery: browse the images of a GitHub repository folder from the terminal.\n\n  --config <path>      Read configuration from <path>\n  --print-config       Print the effective configuration and exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message"
                );
                saw_flag = true;
            }
            "--config" => {
                let Some(path) = args.next() else {
                    anyhow::bail!("--config needs a path");
                };
                options.config_file = Some(PathBuf::from(path));
            }
            "--print-config" => print_config = true,
            other => anyhow::bail!("unknown argument {other:?}; see --help"),
        }
    }

    if print_config {
        let cfg = repo_gallery::config::load(repo_gallery::config::LoadOptions {
            config_file: options.config_file,
            env_prefix: None,
        })?;
        print!("{}", repo_gallery::config::to_yaml(&cfg)?);
        return Ok(Command::Exit);
    }

    if saw_flag {
        Ok(Command::Exit)
    } else {
        Ok(Command::Run(options))
    }
}
