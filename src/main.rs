use clap::Parser;
use matrixup::cli::commands::deploy::DeployFlags;
use matrixup::cli::commands::init::InitFlags;
use matrixup::cli::{validate_env_name, Cli, Commands, SecretsAction, VaultAction};
use matrixup::config::Settings;

fn main() {
    let mut cli = Cli::parse();

    // The -e flag wins; otherwise the config file's default applies.
    cli.env = match cli.env_flag.take() {
        Some(env) => env,
        None => matrixup::cli::project_dir(&cli)
            .ok()
            .and_then(|project| Settings::load(&project).ok())
            .map(|s| s.default_environment)
            .unwrap_or_else(|| "production".to_string()),
    };

    // Validate the environment name early to catch typos.
    if let Err(e) = validate_env_name(&cli.env) {
        matrixup::cli::output::error(&e.to_string());
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Init {
            non_interactive,
            ref server_ip,
            ssh_port,
            ref matrix_domain,
            ref element_domain,
            ref admin_email,
            enable_monitoring,
            enable_turn,
            enable_federation,
            retention_days,
        } => {
            let flags = InitFlags {
                non_interactive,
                server_ip: server_ip.clone(),
                ssh_port,
                matrix_domain: matrix_domain.clone(),
                element_domain: element_domain.clone(),
                admin_email: admin_email.clone(),
                enable_monitoring,
                enable_turn,
                enable_federation,
                retention_days,
            };
            matrixup::cli::commands::init::execute(&cli, &flags)
        }
        Commands::Secrets { ref action } => match action {
            SecretsAction::Generate { force } => {
                matrixup::cli::commands::secrets_generate::execute(&cli, *force)
            }
        },
        Commands::Vault { ref action } => match action {
            VaultAction::View => matrixup::cli::commands::vault_cmd::execute_view(&cli),
            VaultAction::Edit => matrixup::cli::commands::vault_cmd::execute_edit(&cli),
            VaultAction::Rekey => matrixup::cli::commands::vault_cmd::execute_rekey(&cli),
            VaultAction::Validate => matrixup::cli::commands::vault_cmd::execute_validate(&cli),
            VaultAction::Backup { list } => {
                matrixup::cli::commands::vault_cmd::execute_backup(&cli, *list)
            }
        },
        Commands::Deploy {
            ref playbook,
            dry_run,
            verbose,
            ref tags,
            skip_preflight,
            yes,
            smart,
        } => {
            let flags = DeployFlags {
                playbook: playbook.clone(),
                dry_run,
                verbose,
                tags: tags.clone(),
                skip_preflight,
                yes,
                smart,
            };
            matrixup::cli::commands::deploy::execute(&cli, &flags)
        }
        Commands::Preflight { offline, json } => {
            matrixup::cli::commands::preflight_cmd::execute(&cli, offline, json)
        }
        #[cfg(feature = "audit-log")]
        Commands::Audit { last, ref since } => {
            matrixup::cli::commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
        Commands::Version => matrixup::cli::commands::version::execute(),
        Commands::Completions { shell } => matrixup::cli::commands::completions::execute(shell),
    };

    if let Err(e) = result {
        matrixup::cli::output::error(&e.to_string());
        std::process::exit(e.exit_code());
    }
}
