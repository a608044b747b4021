use soroban_sdk::{contractclient, Address, Env};

/// The subset of an NFT collection the vault relies on.
#[contractclient(name = "NftClient")]
pub trait NftInterface {
    fn owner_of(env: Env, token_id: u32) -> Address;

    /// Move `token_id` from `from` to `to`; `from` authorizes.
    fn transfer(env: Env, from: Address, to: Address, token_id: u32);
}
