// Copyright 2019-2025 Parity Technologies (UK) Ltd.
// This file is dual-licensed as Apache-2.0 or GPL-3.0.
// see LICENSE for license details.

macro_rules! cfg_feature {
	($feature:literal, $($item:item)*) => {
		$(
			#[cfg(feature = $feature)]
			#[cfg_attr(docsrs, doc(cfg(feature = $feature)))]
			$item
		)*
	}
}

macro_rules! cfg_ws {
	($($item:item)*) => {
		crate::macros::cfg_feature!("ws", $($item)*);
	};
}

// The mock transport is also compiled for this crate's own tests.
macro_rules! cfg_mock_transport {
	($($item:item)*) => {
		$(
			#[cfg(any(test, feature = "mock-transport"))]
			#[cfg_attr(docsrs, doc(cfg(feature = "mock-transport")))]
			$item
		)*
	}
}

pub(crate) use {cfg_feature, cfg_mock_transport, cfg_ws};
