use anchor_lang::prelude::*;
use anchor_lang::system_program;

pub mod error;
pub mod state;

use error::RegistryError;
use state::{resolve_delegation, RateRegistry};

declare_id!("G713CLfjZCnUUKQRM5xtLAQGtUNJDaUehYK8WkXG5UcC");

#[program]
pub mod rate_registry {
    use super::*;

    pub fn initialize(ctx: Context<Initialize>, initial_wei_per_cent: u64) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let registry = RateRegistry::new(ctx.accounts.owner.key(), initial_wei_per_cent, now)?;
        ctx.accounts.registry.set_inner(registry);

        msg!("Registry initialized at {} wei/cent", initial_wei_per_cent);
        Ok(())
    }

    /// Delegate chain accounts, if any, go in `remaining_accounts` in order.
    pub fn get_exchange_rate_in_usd(ctx: Context<ReadRate>) -> Result<u64> {
        let source = resolve_from_accounts(&ctx.accounts.registry, ctx.remaining_accounts)?;
        Ok(source.exchange_rate_in_usd()?)
    }

    pub fn last_updated(ctx: Context<ReadRate>) -> Result<i64> {
        let source = resolve_from_accounts(&ctx.accounts.registry, ctx.remaining_accounts)?;
        Ok(source.last_updated)
    }

    pub fn get_value_from_dollars(ctx: Context<ReadRate>, dollars: u64) -> Result<u128> {
        let source = resolve_from_accounts(&ctx.accounts.registry, ctx.remaining_accounts)?;
        Ok(source.value_from_dollars(dollars)?)
    }

    pub fn get_value_from_cents(ctx: Context<ReadRate>, cents: u64) -> Result<u128> {
        let source = resolve_from_accounts(&ctx.accounts.registry, ctx.remaining_accounts)?;
        Ok(source.value_from_cents(cents)?)
    }

    pub fn set_exchange_rate(ctx: Context<OwnerOnly>, wei_per_cent: u64, timestamp: i64) -> Result<()> {
        let now = Clock::get()?.unix_timestamp;
        let owner = ctx.accounts.owner.key();
        ctx.accounts
            .registry
            .set_exchange_rate(&owner, wei_per_cent, timestamp, now)?;

        emit!(ExchangeRateUpdated {
            registry: ctx.accounts.registry.key(),
            wei_per_cent,
            timestamp,
        });
        Ok(())
    }

    pub fn set_delegate(ctx: Context<OwnerOnly>, delegate: Option<Pubkey>) -> Result<()> {
        let owner = ctx.accounts.owner.key();
        let own_address = ctx.accounts.registry.key();
        ctx.accounts
            .registry
            .set_delegate(&owner, &own_address, delegate)?;

        emit!(DelegateChanged {
            registry: own_address,
            delegate,
        });
        Ok(())
    }

    /// Send every lamport above the rent-exempt reserve to the owner.
    pub fn withdraw(ctx: Context<OwnerOnly>) -> Result<()> {
        let registry_info = ctx.accounts.registry.to_account_info();
        let owner_info = ctx.accounts.owner.to_account_info();
        let reserve = Rent::get()?.minimum_balance(registry_info.data_len());
        let amount = pay_out(&ctx.accounts.registry, &registry_info, &owner_info, reserve)?;

        msg!("Withdrew {} lamports", amount);
        Ok(())
    }

    /// Anyone may top up the registry. Plain system transfers work too.
    pub fn donate(ctx: Context<Donate>, amount: u64) -> Result<()> {
        system_program::transfer(
            CpiContext::new(
                ctx.accounts.system_program.to_account_info(),
                system_program::Transfer {
                    from: ctx.accounts.donor.to_account_info(),
                    to: ctx.accounts.registry.to_account_info(),
                },
            ),
            amount,
        )
    }
}

/// Walk `registry`'s delegation chain using the supplied accounts.
fn resolve_from_accounts(registry: &RateRegistry, chain: &[AccountInfo]) -> Result<RateRegistry> {
    resolve_delegation::<anchor_lang::error::Error, _>(registry, |next: &Pubkey| {
        let info = chain
            .iter()
            .find(|info| info.key == next)
            .ok_or(RegistryError::DelegateAccountMissing)?;

        if info.owner != &crate::ID {
            return err!(RegistryError::InvalidDelegate);
        }
        let data = info.try_borrow_data()?;
        let delegate = RateRegistry::try_deserialize(&mut &data[..])?;
        Ok(delegate)
    })
}

/// Move everything above `reserve` from the registry account to `owner`.
fn pay_out<'info>(
    registry: &RateRegistry,
    registry_info: &AccountInfo<'info>,
    owner: &AccountInfo<'info>,
    reserve: u64,
) -> Result<u64> {
    let amount = registry.withdrawable(owner.key, registry_info.lamports(), reserve)?;

    if amount > 0 {
        let remaining = registry_info
            .lamports()
            .checked_sub(amount)
            .ok_or(RegistryError::Overflow)?;
        let credited = owner
            .lamports()
            .checked_add(amount)
            .ok_or(RegistryError::Overflow)?;
        **registry_info.try_borrow_mut_lamports()? = remaining;
        **owner.try_borrow_mut_lamports()? = credited;
    }
    Ok(amount)
}

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(init, payer = owner, space = 8 + RateRegistry::INIT_SPACE)]
    pub registry: Account<'info, RateRegistry>,

    #[account(mut)]
    pub owner: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct ReadRate<'info> {
    pub registry: Account<'info, RateRegistry>,
}

/// Owner is verified inside the state machine, not by a `has_one` constraint.
#[derive(Accounts)]
pub struct OwnerOnly<'info> {
    #[account(mut)]
    pub registry: Account<'info, RateRegistry>,

    #[account(mut)]
    pub owner: Signer<'info>,
}

#[derive(Accounts)]
pub struct Donate<'info> {
    #[account(mut)]
    pub registry: Account<'info, RateRegistry>,

    #[account(mut)]
    pub donor: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[event]
pub struct ExchangeRateUpdated {
    pub registry: Pubkey,
    pub wei_per_cent: u64,
    pub timestamp: i64,
}

#[event]
pub struct DelegateChanged {
    pub registry: Pubkey,
    pub delegate: Option<Pubkey>,
}
