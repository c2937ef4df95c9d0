pub mod mock_nodes;
