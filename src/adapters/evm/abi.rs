//! Contract bindings for the Uniswap V2 style router and ERC20 tokens.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

sol! {
    interface IERC20 {
        function approve(address spender, uint256 value) external returns (bool);
        function balanceOf(address owner) external view returns (uint256);
    }

    interface IUniswapV2Router02 {
        function swapExactETHForTokens(
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] calldata path,
            address to,
            uint256 deadline
        ) external returns (uint256[] memory amounts);

        function getAmountsOut(
            uint256 amountIn,
            address[] calldata path
        ) external view returns (uint256[] memory amounts);
    }
}

pub fn encode_approve(spender: Address, value: U256) -> Bytes {
    IERC20::approveCall { spender, value }.abi_encode().into()
}

pub fn encode_balance_of(owner: Address) -> Bytes {
    IERC20::balanceOfCall { owner }.abi_encode().into()
}

pub fn encode_swap_native_for_tokens(
    amount_out_min: U256,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
) -> Bytes {
    IUniswapV2Router02::swapExactETHForTokensCall {
        amountOutMin: amount_out_min,
        path,
        to,
        deadline,
    }
    .abi_encode()
    .into()
}

pub fn encode_swap_tokens_for_native(
    amount_in: U256,
    amount_out_min: U256,
    path: Vec<Address>,
    to: Address,
    deadline: U256,
) -> Bytes {
    IUniswapV2Router02::swapExactTokensForETHCall {
        amountIn: amount_in,
        amountOutMin: amount_out_min,
        path,
        to,
        deadline,
    }
    .abi_encode()
    .into()
}

pub fn encode_get_amounts_out(amount_in: U256, path: Vec<Address>) -> Bytes {
    IUniswapV2Router02::getAmountsOutCall {
        amountIn: amount_in,
        path,
    }
    .abi_encode()
    .into()
}
