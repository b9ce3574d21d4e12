//! Live reserve reads from a constant-product factory/pair

use crate::rpc::abi::{IPoolFactory, IPoolPair};
use crate::rpc::{decode, ChainClient};
use crate::Result;
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;

/// Pool reserves oriented to a trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolReserves {
    pub pair: Address,
    #[serde(with = "crate::tokens::decimal")]
    pub reserve_in: U256,
    #[serde(with = "crate::tokens::decimal")]
    pub reserve_out: U256,
}

/// Read the reserves of the `token_in`/`token_out` pair.
///
/// `Ok(None)` when the factory has no such pair.
pub async fn fetch_pool_reserves(
    client: &dyn ChainClient,
    factory: Address,
    token_in: Address,
    token_out: Address,
) -> Result<Option<PoolReserves>> {
    let data = IPoolFactory::getPairCall {
        tokenA: token_in,
        tokenB: token_out,
    }
    .abi_encode();
    let out = client.call(factory, data.into()).await?;
    let pair = decode::<IPoolFactory::getPairCall>(&out)?;
    if pair.is_zero() {
        tracing::debug!(chain = %client.chain(), %token_in, %token_out, "No pair for tokens");
        return Ok(None);
    }

    let out = client
        .call(pair, IPoolPair::getReservesCall {}.abi_encode().into())
        .await?;
    let reserves = decode::<IPoolPair::getReservesCall>(&out)?;
    let out = client
        .call(pair, IPoolPair::token0Call {}.abi_encode().into())
        .await?;
    let token0 = decode::<IPoolPair::token0Call>(&out)?;

    let (reserve_in, reserve_out) = if token0 == token_in {
        (reserves.reserve0, reserves.reserve1)
    } else {
        (reserves.reserve1, reserves.reserve0)
    };

    Ok(Some(PoolReserves {
        pair,
        reserve_in,
        reserve_out,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chains::Chain;
    use crate::rpc::mock::MockChainClient;
    use alloy::primitives::address;
    use alloy::sol_types::SolValue;

    pub(crate) const FACTORY: Address = address!("fac0000000000000000000000000000000000001");
    pub(crate) const PAIR: Address = address!("ba1e000000000000000000000000000000000002");
    const TOKEN_A: Address = address!("aaaa000000000000000000000000000000000001");
    const TOKEN_B: Address = address!("bbbb000000000000000000000000000000000002");

    /// Register a pair with reserves listed in token0/token1 order
    pub(crate) fn with_pool(
        client: MockChainClient,
        factory: Address,
        pair: Address,
        token0: Address,
        reserve0: U256,
        reserve1: U256,
    ) -> MockChainClient {
        client
            .with_response(factory, IPoolFactory::getPairCall::SELECTOR, (pair,).abi_encode_params())
            .with_response(
                pair,
                IPoolPair::getReservesCall::SELECTOR,
                (reserve0, reserve1, 0u32).abi_encode_params(),
            )
            .with_response(pair, IPoolPair::token0Call::SELECTOR, (token0,).abi_encode_params())
    }

    /// Register one of several pairs: the factory resolves it only for
    /// `token_a`/`token_b` in either order, and `token_a` is token0
    pub(crate) fn with_pair(
        client: MockChainClient,
        factory: Address,
        pair: Address,
        (token_a, reserve_a): (Address, U256),
        (token_b, reserve_b): (Address, U256),
    ) -> MockChainClient {
        let lookup = |a: Address, b: Address| IPoolFactory::getPairCall { tokenA: a, tokenB: b }.abi_encode();
        client
            .with_call_response(factory, lookup(token_a, token_b), (pair,).abi_encode_params())
            .with_call_response(factory, lookup(token_b, token_a), (pair,).abi_encode_params())
            .with_response(
                pair,
                IPoolPair::getReservesCall::SELECTOR,
                (reserve_a, reserve_b, 0u32).abi_encode_params(),
            )
            .with_response(pair, IPoolPair::token0Call::SELECTOR, (token_a,).abi_encode_params())
    }

    #[tokio::test]
    async fn test_pairs_resolved_by_tokens() {
        const OTHER_PAIR: Address = address!("ba1e000000000000000000000000000000000003");
        const TOKEN_C: Address = address!("cccc000000000000000000000000000000000003");
        let client = with_pair(
            with_pair(
                MockChainClient::new(Chain::Base),
                FACTORY,
                PAIR,
                (TOKEN_A, U256::from(100u64)),
                (TOKEN_B, U256::from(900u64)),
            ),
            FACTORY,
            OTHER_PAIR,
            (TOKEN_B, U256::from(7u64)),
            (TOKEN_C, U256::from(3u64)),
        );

        let ab = fetch_pool_reserves(&client, FACTORY, TOKEN_B, TOKEN_A)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((ab.pair, ab.reserve_in, ab.reserve_out), (PAIR, U256::from(900u64), U256::from(100u64)));

        let cb = fetch_pool_reserves(&client, FACTORY, TOKEN_C, TOKEN_B)
            .await
            .unwrap()
            .unwrap();
        assert_eq!((cb.pair, cb.reserve_in, cb.reserve_out), (OTHER_PAIR, U256::from(3u64), U256::from(7u64)));
    }

    #[tokio::test]
    async fn test_reserves_oriented_to_input() {
        let client = with_pool(
            MockChainClient::new(Chain::Base),
            FACTORY,
            PAIR,
            TOKEN_A,
            U256::from(100u64),
            U256::from(900u64),
        );

        let forward = fetch_pool_reserves(&client, FACTORY, TOKEN_A, TOKEN_B)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(forward.pair, PAIR);
        assert_eq!(forward.reserve_in, U256::from(100u64));
        assert_eq!(forward.reserve_out, U256::from(900u64));

        let backward = fetch_pool_reserves(&client, FACTORY, TOKEN_B, TOKEN_A)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(backward.reserve_in, U256::from(900u64));
        assert_eq!(backward.reserve_out, U256::from(100u64));
    }

    #[tokio::test]
    async fn test_missing_pair_is_none() {
        let client = MockChainClient::new(Chain::Base).with_response(
            FACTORY,
            IPoolFactory::getPairCall::SELECTOR,
            (Address::ZERO,).abi_encode_params(),
        );
        let reserves = fetch_pool_reserves(&client, FACTORY, TOKEN_A, TOKEN_B)
            .await
            .unwrap();
        assert!(reserves.is_none());
        assert_eq!(client.calls(), 1);
    }
}
