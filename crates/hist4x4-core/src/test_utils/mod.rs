pub mod mock_responses_server;
