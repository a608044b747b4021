use soroban_sdk::{token, Address, Env};

use crate::engine::FundingSource;

/// [`FundingSource`] backed by Soroban token contracts.
///
/// Transfers go through the `try_` client variants so a failing token
/// surfaces as `false` and the engine can abort instead of trapping midway.
pub struct TokenFunding<'a> {
    env: &'a Env,
    pool: Address,
    stake_token: Address,
    reward_token: Address,
    mint_rewards: bool,
}

impl<'a> TokenFunding<'a> {
    /// Funding in `stake_token` held by the current contract. Rewards are paid
    /// in the same token unless [`with_reward_token`](Self::with_reward_token)
    /// says otherwise.
    pub fn new(env: &'a Env, stake_token: Address) -> Self {
        Self {
            env,
            pool: env.current_contract_address(),
            reward_token: stake_token.clone(),
            stake_token,
            mint_rewards: false,
        }
    }

    pub fn with_reward_token(mut self, reward_token: Address) -> Self {
        self.reward_token = reward_token;
        self
    }

    /// Realize accrued emission by minting the reward token to the pool. The
    /// pool must be the token's admin.
    pub fn minting(mut self) -> Self {
        self.mint_rewards = true;
        self
    }

    fn transfer(&self, token: &Address, from: &Address, to: &Address, amount: i128) -> bool {
        if amount == 0 {
            return true;
        }
        matches!(
            token::TokenClient::new(self.env, token).try_transfer(from, to, &amount),
            Ok(Ok(()))
        )
    }
}

impl FundingSource for TokenFunding<'_> {
    type Party = Address;

    fn pull(&mut self, from: &Address, amount: i128) -> bool {
        self.transfer(&self.stake_token, from, &self.pool, amount)
    }

    fn push(&mut self, to: &Address, amount: i128) -> bool {
        self.transfer(&self.stake_token, &self.pool, to, amount)
    }

    fn balance_of(&self, holder: &Address) -> i128 {
        token::TokenClient::new(self.env, &self.stake_token).balance(holder)
    }

    fn push_reward(&mut self, to: &Address, amount: i128) -> bool {
        self.transfer(&self.reward_token, &self.pool, to, amount)
    }

    fn realize(&mut self, participants: i128, others: i128) -> bool {
        if !self.mint_rewards {
            return true;
        }
        let Some(total) = participants.checked_add(others) else {
            return false;
        };
        matches!(
            token::StellarAssetClient::new(self.env, &self.reward_token)
                .try_mint(&self.pool, &total),
            Ok(Ok(()))
        )
    }
}
