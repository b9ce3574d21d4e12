//! Contract interfaces used by the agent

use alloy::sol;

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
        function totalSupply() external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Mints PUSD from an input token and redeems it back
    interface IPusdConnector {
        function purchase(bytes path, uint256 amount, uint256 min_amount) external payable;
        function withdraw(uint256 amount) external payable;
        function gas_fee() external view returns (uint256);
    }

    interface IEtfConnector {
        function buy(
            address etf_token,
            uint256 etf_amount,
            uint256 usd_amount,
            address recipient,
            bytes path,
            uint256 deadline
        ) external payable;
        function sell(address etf_token, uint256 etf_amount, uint256 deadline, address recipient) external payable;
        function gas_fee() external view returns (uint256);
    }

    interface IPoolRouter {
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external returns (uint256[] amounts);
        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] amounts);
        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external returns (uint256[] amounts);
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
        function removeLiquidity(
            address tokenA,
            address tokenB,
            uint256 liquidity,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB);
    }

    interface IPoolFactory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    // Reserves are uint112 on-chain; they are read as full words here.
    interface IPoolPair {
        function getReserves() external view returns (uint256 reserve0, uint256 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
    }
}
