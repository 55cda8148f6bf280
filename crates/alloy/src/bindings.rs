//! Generated bindings for the deployed WavePortal contract.

use alloy_sol_types::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug)]
    contract WavePortal {
        /// One recorded wave.
        struct Wave {
            address waver;
            string message;
            uint256 timestamp;
        }

        /// Raised once per recorded wave.
        event NewWave(address indexed from, uint256 timestamp, string message);

        /// Records a wave carrying `message`.
        function wave(string memory message) public;

        /// Every recorded wave, in recording order.
        function getAllWaves() public view returns (Wave[] memory);

        /// Number of waves recorded so far.
        function getTotalWaves() public view returns (uint256);
    }
}
