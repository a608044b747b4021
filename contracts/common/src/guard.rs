use soroban_sdk::{symbol_short, Env, Symbol};

const LOCKED: Symbol = symbol_short!("LOCKED");

pub fn is_locked(env: &Env) -> bool {
    env.storage().instance().get(&LOCKED).unwrap_or(false)
}

/// Run `body` as an exclusive section of the current contract.
///
/// A nested entry while the section is open fails with `reentrant` instead
/// of interleaving with the action in flight. On error the host discards the
/// lock together with every other write of the invocation.
pub fn non_reentrant<T, E>(
    env: &Env,
    reentrant: E,
    body: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    if is_locked(env) {
        return Err(reentrant);
    }
    env.storage().instance().set(&LOCKED, &true);
    let result = body();
    env.storage().instance().remove(&LOCKED);
    result
}
