//! Command execution: build the service clients and call into the library.

use anyhow::{bail, Context};
use keykeeper_custody::{
    AccountManager, CustodyAccounts, CustodyService, CustodyWallets, KmdClient, WalletManager,
    WalletSigner,
};
use keykeeper_ledger::{get_auth_addr, AlgodClient, LedgerRekeying, LedgerService, RekeyPolicy, Rekeying};
use keykeeper_types::Address;
use std::sync::Arc;

use crate::config::KeykeeperConfig;
use crate::{AccountAction, Command, RekeyAction, Unlock, WalletAction};

fn custody(config: &KeykeeperConfig) -> anyhow::Result<Arc<dyn CustodyService>> {
    let client = KmdClient::new(
        config.custody_url.as_str(),
        config.custody_token.as_str(),
        config.http_settings(),
    )?;
    Ok(Arc::new(client))
}

fn ledger(config: &KeykeeperConfig) -> anyhow::Result<Arc<dyn LedgerService>> {
    let client = AlgodClient::new(
        config.ledger_url.as_str(),
        config.ledger_token.as_str(),
        config.http_settings(),
    )?;
    Ok(Arc::new(client))
}

pub(crate) async fn run(command: Command, config: &KeykeeperConfig) -> anyhow::Result<()> {
    match command {
        Command::Wallet { action } => wallet(action, config).await,
        Command::Account { action } => account(action, config).await,
        Command::Rekey { action } => rekey(action, config).await,
    }
}

async fn wallet(action: WalletAction, config: &KeykeeperConfig) -> anyhow::Result<()> {
    let wallets = CustodyWallets::new(custody(config)?);
    match action {
        WalletAction::List => {
            for wallet in wallets.list().await? {
                println!("{}\t{}", wallet.id, wallet.name);
            }
        }
        WalletAction::Get { name } => {
            let wallet = wallets.get(&name).await?;
            println!("{}\t{}", wallet.id, wallet.name);
        }
        WalletAction::Create { name, password } => {
            let wallet = wallets.create(&name, &password.password).await?;
            println!("{}\t{}", wallet.id, wallet.name);
        }
        WalletAction::Recover {
            name,
            password,
            phrase,
        } => {
            let wallet = wallets.recover(&name, &password.password, &phrase).await?;
            println!("{}\t{}", wallet.id, wallet.name);
        }
        WalletAction::ExportBackup { name, password } => {
            println!("{}", wallets.export_backup_phrase(&name, &password.password).await?);
        }
    }
    Ok(())
}

async fn account(action: AccountAction, config: &KeykeeperConfig) -> anyhow::Result<()> {
    let accounts = CustodyAccounts::new(custody(config)?);
    match action {
        AccountAction::List { unlock } => {
            for address in accounts
                .list_accounts(&unlock.wallet, &unlock.password.password)
                .await?
            {
                println!("{address}");
            }
        }
        AccountAction::Create { unlock, count } => {
            match accounts
                .create_accounts(&unlock.wallet, &unlock.password.password, count)
                .await
            {
                Ok(created) => created.iter().for_each(|address| println!("{address}")),
                Err(partial) => {
                    partial.created.iter().for_each(|address| println!("{address}"));
                    return Err(partial.into());
                }
            }
        }
        AccountAction::Delete { unlock, addresses } => {
            let addresses: Vec<Address> = addresses.into_iter().map(Address::new).collect();
            let failures = accounts
                .delete_accounts(&unlock.wallet, &unlock.password.password, &addresses)
                .await?;
            if !failures.is_empty() {
                for (address, error) in &failures {
                    eprintln!("{address}: {}", error.report());
                }
                bail!("{} of {} deletions failed", failures.len(), addresses.len());
            }
        }
        AccountAction::Export { unlock, address } => {
            let phrase = accounts
                .export_private_key(
                    &unlock.wallet,
                    &unlock.password.password,
                    &Address::new(address),
                )
                .await?;
            println!("{phrase}");
        }
    }
    Ok(())
}

fn rekeying(
    config: &KeykeeperConfig,
    unlock: &Unlock,
    policy: RekeyPolicy,
) -> anyhow::Result<LedgerRekeying> {
    let signer = WalletSigner::new(custody(config)?, &unlock.wallet, &unlock.password.password)?;
    Ok(LedgerRekeying::new(ledger(config)?, Arc::new(signer)).with_policy(policy))
}

async fn rekey(action: RekeyAction, config: &KeykeeperConfig) -> anyhow::Result<()> {
    match action {
        RekeyAction::AuthAddr { address } => {
            let ledger = ledger(config)?;
            let auth = get_auth_addr(ledger.as_ref(), &Address::new(address)).await?;
            println!("{auth}");
        }
        RekeyAction::To {
            unlock,
            from,
            to,
            require_rekey_back,
        } => {
            let policy = if require_rekey_back {
                RekeyPolicy::RequireRekeyBack
            } else {
                RekeyPolicy::AllowOverwrite
            };
            let tx_id = rekeying(config, &unlock, policy)?
                .rekey(&Address::new(from), &Address::new(to))
                .await
                .context("rekey failed")?;
            println!("{tx_id}");
        }
        RekeyAction::Back { unlock, account } => {
            let outcome = rekeying(config, &unlock, RekeyPolicy::default())?
                .rekey_back(&Address::new(account))
                .await
                .context("rekey back failed")?;
            match outcome {
                Some(tx_id) => println!("{tx_id}"),
                None => println!("account is not rekeyed"),
            }
        }
    }
    Ok(())
}
